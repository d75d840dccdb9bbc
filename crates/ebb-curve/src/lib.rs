//! # ebb-curve: decaying rate curve.
//!
//! All calculations use integer arithmetic only for determinism.
//!
//! - **Discrete decay**: the rate at batch `b` is `initial_rate * (num/den)^b`,
//!   computed with fixed-point binary exponentiation at 10^36 precision.
//! - **Range averages**: the average over a cumulative-volume range weights
//!   each overlapped batch by its overlap width. The un-divided weighted sum
//!   is exposed so callers can accumulate it across many sub-ranges exactly.
//! - **Rate limits**: a minimum acceptable rate maps to the volume at which
//!   the curve first drops below it.

pub mod curve;

pub use curve::RateCurve;
