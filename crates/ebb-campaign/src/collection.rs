//! Payout of entitlements for verified periods.
//!
//! Rates are tokens per contributed base unit, so a contributor's
//! entitlement is `contributed * verified_average / RATE_PRECISION`.
//! Each (period, contributor) pair pays out at most once.

use std::collections::HashSet;

use ebb_core::constants::RATE_PRECISION;
use ebb_core::error::{CampaignError, CurveError};
use ebb_core::traits::TokenIssuer;
use ebb_core::types::{AccountId, Amount, PeriodIndex, PeriodStatus};
use ebb_core::wide::mul_div_floor;
use tracing::info;

use crate::ledger::Period;

#[derive(Debug, Default, Clone)]
pub struct CollectionManager {
    collected: HashSet<(PeriodIndex, AccountId)>,
    total_issued: Amount,
}

impl CollectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `contributor` already collected for `period`.
    pub fn has_collected(&self, period: PeriodIndex, contributor: &AccountId) -> bool {
        self.collected.contains(&(period, *contributor))
    }

    /// Tokens credited so far across all periods.
    pub fn total_issued(&self) -> Amount {
        self.total_issued
    }

    /// What `contributor` would receive from `period` right now.
    ///
    /// Fails with `PeriodNotVerified` before verification and with
    /// `NothingToCollect` when there is no contribution, the entitlement
    /// rounds to zero, or it was already collected.
    pub fn entitlement(&self, period: &Period, contributor: &AccountId) -> Result<Amount, CampaignError> {
        let rate = match (period.status(), period.verified_average()) {
            (PeriodStatus::Verified, Some(rate)) => rate,
            _ => return Err(CampaignError::PeriodNotVerified(period.index())),
        };

        let nothing = || CampaignError::NothingToCollect {
            contributor: *contributor,
            period: period.index(),
        };
        if self.has_collected(period.index(), contributor) {
            return Err(nothing());
        }
        let contributed = period.contributed_by(contributor);
        if contributed == 0 {
            return Err(nothing());
        }

        let tokens = mul_div_floor(contributed, rate, RATE_PRECISION).ok_or(CurveError::Overflow)?;
        if tokens == 0 {
            return Err(nothing());
        }
        Ok(tokens)
    }

    /// Credit `contributor`'s entitlement for `period` through `issuer`.
    pub fn collect(
        &mut self,
        period: &Period,
        contributor: &AccountId,
        issuer: &mut dyn TokenIssuer,
    ) -> Result<Amount, CampaignError> {
        let tokens = self.entitlement(period, contributor)?;
        let total_issued = self
            .total_issued
            .checked_add(tokens)
            .ok_or(CurveError::Overflow)?;

        self.collected.insert((period.index(), *contributor));
        self.total_issued = total_issued;
        issuer.credit(contributor, tokens);

        info!(period = period.index(), %contributor, tokens, "entitlement collected");
        Ok(tokens)
    }
}
