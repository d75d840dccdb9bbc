//! Protocol constants. All amounts are in base units (1 unit = 10^18 base units).

/// Base units per whole contribution unit.
pub const UNIT: u128 = 1_000_000_000_000_000_000;

/// Fixed-point scale of every [`Rate`](crate::types::Rate): `RATE_PRECISION` == 1.0.
pub const RATE_PRECISION: u128 = 1_000_000_000_000_000_000;

/// Internal precision of the decay factor and its powers.
///
/// 10^36 still fits a `u128` and keeps the accumulated truncation of
/// exponentiation-by-squaring far below one unit of [`RATE_PRECISION`].
pub const FACTOR_PRECISION: u128 = 1_000_000_000_000_000_000_000_000_000_000_000_000;

/// Tokens issued per unit at batch 0 (100.0 in fixed point).
pub const DEFAULT_INITIAL_RATE: u128 = 100 * RATE_PRECISION;

/// Default per-batch decay factor 99/100.
pub const DEFAULT_DECAY_NUMERATOR: u128 = 99;
pub const DEFAULT_DECAY_DENOMINATOR: u128 = 100;

/// Contributed volume per batch: 20 units.
pub const DEFAULT_BATCH_SIZE: u128 = 20 * UNIT;

/// Smallest accepted contribution: 1 unit.
pub const DEFAULT_MIN_CONTRIBUTION: u128 = UNIT;

/// Length of a clearance period in blocks.
pub const DEFAULT_PERIOD_DURATION_BLOCKS: u64 = 10;

/// Upper bound on ledger entries consumed by one verification step call.
pub const DEFAULT_MAX_VERIFY_STEPS: usize = 256;
