//! Error types for the Ebb campaign engine.
use thiserror::Error;

use crate::types::{AccountId, Amount, BlockHeight, PeriodIndex};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CurveError {
    #[error("invalid range: end {end} must exceed start {start}")] InvalidRange { start: Amount, end: Amount },
    #[error("arithmetic overflow")] Overflow,
    #[error("invalid rate parameters: {0}")] InvalidParameters(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CampaignError {
    #[error("caller {0} is not authorized")] Unauthorized(AccountId),
    #[error("contributions are halted")] GateHalted,
    #[error("contribution below minimum: {amount} < {minimum}")] BelowMinimum { amount: Amount, minimum: Amount },
    #[error("period {0} is not closed")] PeriodNotClosed(PeriodIndex),
    #[error("average already submitted for period {0}")] AlreadySubmitted(PeriodIndex),
    #[error("period {0} already resolved")] AlreadyResolved(PeriodIndex),
    #[error("nothing to collect for {contributor} in period {period}")] NothingToCollect { contributor: AccountId, period: PeriodIndex },
    #[error("unknown period: {0}")] UnknownPeriod(PeriodIndex),
    #[error("period {0} cannot be verified before its predecessor")] PreviousPeriodUnverified(PeriodIndex),
    #[error("no average submitted for period {0}")] NothingSubmitted(PeriodIndex),
    #[error("period {0} is not verified")] PeriodNotVerified(PeriodIndex),
    #[error("stale block {block}: current period started at {period_start}")] StaleBlock { block: BlockHeight, period_start: BlockHeight },
    #[error(transparent)] Curve(#[from] CurveError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config io: {0}")] Io(#[from] std::io::Error),
    #[error("config parse: {0}")] Parse(String),
    #[error("invalid config: {0}")] Invalid(String),
}

#[derive(Error, Debug)]
pub enum EbbError {
    #[error(transparent)] Curve(#[from] CurveError),
    #[error(transparent)] Campaign(#[from] CampaignError),
    #[error(transparent)] Config(#[from] ConfigError),
}
