//! Core campaign types: accounts, curve parameters, ledger records.
//!
//! Amounts and cumulative volumes are `u128` base units. Rates are `u128`
//! fixed-point values scaled by [`RATE_PRECISION`](crate::constants::RATE_PRECISION).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_DECAY_DENOMINATOR, DEFAULT_DECAY_NUMERATOR, DEFAULT_INITIAL_RATE,
};
use crate::error::CurveError;

/// Contributed value in base units.
pub type Amount = u128;

/// Fixed-point rate: tokens per contributed base unit, scaled by `RATE_PRECISION`.
pub type Rate = u128;

/// Host block height.
pub type BlockHeight = u64;

/// Zero-based clearance period sequence number.
pub type PeriodIndex = u64;

/// A 20-byte account identifier.
///
/// Rendered and parsed as `0x`-prefixed lowercase hex.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(pub [u8; 20]);

impl AccountId {
    /// The all-zero account.
    pub const ZERO: Self = Self([0u8; 20]);

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for AccountId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits).map_err(|e| format!("invalid account hex: {e}"))?;
        let array: [u8; 20] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| format!("account must be 20 bytes, got {}", b.len()))?;
        Ok(Self(array))
    }
}

impl TryFrom<String> for AccountId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AccountId> for String {
    fn from(id: AccountId) -> Self {
        id.to_string()
    }
}

impl From<[u8; 20]> for AccountId {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

/// Parameters of the decaying rate curve. Immutable once validated.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateParameters {
    /// Rate at batch 0, fixed-point.
    pub initial_rate: Rate,
    /// Numerator of the per-batch decay factor.
    pub decay_numerator: u128,
    /// Denominator of the per-batch decay factor.
    pub decay_denominator: u128,
    /// Contributed volume covered by one batch.
    pub batch_size: Amount,
}

impl Default for RateParameters {
    fn default() -> Self {
        Self {
            initial_rate: DEFAULT_INITIAL_RATE,
            decay_numerator: DEFAULT_DECAY_NUMERATOR,
            decay_denominator: DEFAULT_DECAY_DENOMINATOR,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl RateParameters {
    /// Check `0 < num/den <= 1`, a positive batch size and a positive initial rate.
    pub fn validate(&self) -> Result<(), CurveError> {
        if self.decay_denominator == 0 {
            return Err(CurveError::InvalidParameters("decay denominator is zero".into()));
        }
        if self.decay_numerator == 0 {
            return Err(CurveError::InvalidParameters("decay numerator is zero".into()));
        }
        if self.decay_numerator > self.decay_denominator {
            return Err(CurveError::InvalidParameters(format!(
                "decay factor {}/{} exceeds one",
                self.decay_numerator, self.decay_denominator
            )));
        }
        if self.batch_size == 0 {
            return Err(CurveError::InvalidParameters("batch size is zero".into()));
        }
        if self.initial_rate == 0 {
            return Err(CurveError::InvalidParameters("initial rate is zero".into()));
        }
        Ok(())
    }
}

/// Lifecycle state of a clearance period.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PeriodStatus {
    /// Accepting contributions.
    Open,
    /// Duration elapsed; awaiting an average submission.
    Closed,
    /// A candidate average is being checked step by step.
    Verifying,
    /// The candidate matched; the average is final.
    Verified,
    /// The candidate did not match; a new submission is required.
    Rejected,
}

impl PeriodStatus {
    /// Whether verification has finished for the current submission.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Verified | Self::Rejected)
    }
}

impl fmt::Display for PeriodStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Verifying => "verifying",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// One accepted contribution as recorded by the ledger.
///
/// Covers the cumulative-volume range `[volume_start, volume_start + amount)`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContributionEntry {
    /// Account entitled to collect for this entry.
    pub contributor: AccountId,
    /// Net accepted amount.
    pub amount: Amount,
    /// Cumulative accepted volume before this entry.
    pub volume_start: Amount,
}

impl ContributionEntry {
    /// Exclusive end of the entry's volume range.
    pub fn volume_end(&self) -> Amount {
        self.volume_start + self.amount
    }
}

/// Process-wide running totals.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LedgerTotals {
    /// Raw value received, including refused remainders.
    pub total_received: Amount,
    /// Value counted toward cumulative volume.
    pub total_accepted: Amount,
    /// Number of admitted contributions.
    pub contribution_count: u64,
    /// Index of the open period.
    pub current_period_index: PeriodIndex,
    /// Block at which the open period started.
    pub period_start_block: BlockHeight,
}

/// Identity and clock of the caller of a mutating operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallContext {
    pub caller: AccountId,
    pub block: BlockHeight,
}

impl CallContext {
    pub fn new(caller: AccountId, block: BlockHeight) -> Self {
        Self { caller, block }
    }
}

/// Result of admitting a contribution through the gate.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct AcceptedContribution {
    /// Account that sent the value; receives any refund.
    pub sender: AccountId,
    /// Account credited with the entry.
    pub beneficiary: AccountId,
    /// Raw value received.
    pub received: Amount,
    /// Portion counted toward cumulative volume.
    pub accepted: Amount,
    /// Portion refused by the price cap.
    pub refunded: Amount,
}
