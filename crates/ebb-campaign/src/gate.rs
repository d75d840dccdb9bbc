//! Admission control over incoming contributions.
//!
//! The gate is pure with respect to the ledger: it decides whether a
//! contribution is admitted and how much of it counts toward cumulative
//! volume, but records nothing. Recording happens in
//! [`PeriodLedger`](crate::ledger::PeriodLedger).

use ebb_core::error::CampaignError;
use ebb_core::traits::Authorizer;
use ebb_core::types::{AcceptedContribution, AccountId, Amount};
use tracing::info;

/// Active/halted flag, minimum floor and the admin capability.
pub struct AdmissionGate {
    active: bool,
    min_contribution: Amount,
    authorizer: Box<dyn Authorizer>,
}

impl AdmissionGate {
    /// An active gate with the given floor and admin policy.
    pub fn new(min_contribution: Amount, authorizer: Box<dyn Authorizer>) -> Self {
        Self {
            active: true,
            min_contribution,
            authorizer,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn min_contribution(&self) -> Amount {
        self.min_contribution
    }

    /// Whether `caller` holds the admin capability.
    pub fn is_admin(&self, caller: &AccountId) -> bool {
        self.authorizer.is_admin(caller)
    }

    /// Stop admitting contributions. Idempotent.
    pub fn halt(&mut self, caller: &AccountId) -> Result<(), CampaignError> {
        self.set_active(caller, false)
    }

    /// Admit contributions again. Idempotent.
    pub fn resume(&mut self, caller: &AccountId) -> Result<(), CampaignError> {
        self.set_active(caller, true)
    }

    fn set_active(&mut self, caller: &AccountId, active: bool) -> Result<(), CampaignError> {
        if !self.authorizer.is_admin(caller) {
            return Err(CampaignError::Unauthorized(*caller));
        }
        if self.active != active {
            self.active = active;
            info!(%caller, active, "admission gate toggled");
        }
        Ok(())
    }

    /// Decide how much of `amount` is admitted.
    ///
    /// `price_cap_volume` is a cumulative-volume ceiling: only the part of the
    /// contribution that fits below it (given `total_accepted` so far) counts;
    /// the rest is reported as refunded.
    pub fn accept(
        &self,
        sender: AccountId,
        beneficiary: AccountId,
        amount: Amount,
        price_cap_volume: Option<Amount>,
        total_accepted: Amount,
    ) -> Result<AcceptedContribution, CampaignError> {
        if !self.active {
            return Err(CampaignError::GateHalted);
        }
        if amount == 0 || amount < self.min_contribution {
            return Err(CampaignError::BelowMinimum {
                amount,
                minimum: self.min_contribution.max(1),
            });
        }

        let accepted = match price_cap_volume {
            Some(cap) => amount.min(cap.saturating_sub(total_accepted)),
            None => amount,
        };

        Ok(AcceptedContribution {
            sender,
            beneficiary,
            received: amount,
            accepted,
            refunded: amount - accepted,
        })
    }
}
