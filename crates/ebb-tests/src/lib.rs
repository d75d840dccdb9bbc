//! Integration test suite for Ebb.
//!
//! Drives whole campaigns through contribution, rollover, verification and
//! collection, and checks ledger invariants under randomized inputs.

pub mod helpers;
