//! The campaign facade.
//!
//! [`Campaign`] composes the gate, ledger, verifier and collection manager
//! behind one serialized surface. Every mutating call takes `&mut self`,
//! validates before mutating and either completes or leaves state untouched.

use ebb_core::error::{CampaignError, EbbError};
use ebb_core::traits::{Authorizer, SingleAdmin, TokenIssuer, ValueRouter};
use ebb_core::types::{
    AcceptedContribution, AccountId, Amount, BlockHeight, CallContext, LedgerTotals, PeriodIndex,
    PeriodStatus, Rate,
};
use ebb_curve::RateCurve;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::collection::CollectionManager;
use crate::config::CampaignConfig;
use crate::gate::AdmissionGate;
use crate::ledger::{Period, PeriodLedger};
use crate::memory::{MemoryIssuer, MemoryRouter};
use crate::verifier::StepOutcome;

/// What happened to one contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContributionReceipt {
    pub contribution: AcceptedContribution,
    /// Period the accepted portion was recorded in.
    pub period: PeriodIndex,
    /// Period closed by the rollover this contribution triggered.
    pub closed: Option<PeriodIndex>,
}

pub struct Campaign {
    config: CampaignConfig,
    curve: RateCurve,
    gate: AdmissionGate,
    ledger: PeriodLedger,
    collection: CollectionManager,
    router: Box<dyn ValueRouter>,
    issuer: Box<dyn TokenIssuer>,
}

impl Campaign {
    /// Build a campaign from a validated config and its collaborators.
    pub fn new(
        config: CampaignConfig,
        authorizer: Box<dyn Authorizer>,
        router: Box<dyn ValueRouter>,
        issuer: Box<dyn TokenIssuer>,
    ) -> Result<Self, EbbError> {
        config.validate()?;
        let curve = RateCurve::new(config.rate)?;
        let gate = AdmissionGate::new(config.min_contribution, authorizer);
        let ledger = PeriodLedger::new(config.start_block, config.period_duration_blocks);

        info!(
            admin = %config.admin,
            start_block = config.start_block,
            period_duration_blocks = config.period_duration_blocks,
            min_contribution = config.min_contribution,
            "campaign started"
        );

        Ok(Self {
            config,
            curve,
            gate,
            ledger,
            collection: CollectionManager::new(),
            router,
            issuer,
        })
    }

    /// A campaign administered by `config.admin` with in-memory collaborators.
    ///
    /// The returned router and issuer share state with the ones the campaign
    /// owns and can be used to inspect balances.
    pub fn with_memory_collaborators(
        config: CampaignConfig,
    ) -> Result<(Self, MemoryRouter, MemoryIssuer), EbbError> {
        let router = MemoryRouter::default();
        let issuer = MemoryIssuer::default();
        let campaign = Self::new(
            config.clone(),
            Box::new(SingleAdmin(config.admin)),
            Box::new(router.clone()),
            Box::new(issuer.clone()),
        )?;
        Ok((campaign, router, issuer))
    }

    // --- admin ---

    pub fn halt(&mut self, ctx: &CallContext) -> Result<(), CampaignError> {
        self.gate.halt(&ctx.caller)
    }

    pub fn resume(&mut self, ctx: &CallContext) -> Result<(), CampaignError> {
        self.gate.resume(&ctx.caller)
    }

    // --- contributions ---

    /// Uncapped contribution credited to the caller.
    pub fn contribute(
        &mut self,
        ctx: &CallContext,
        amount: Amount,
    ) -> Result<ContributionReceipt, CampaignError> {
        self.contribute_for(ctx, ctx.caller, amount, None)
    }

    /// Contribution paid by the caller and credited to `beneficiary`.
    ///
    /// With `price_cap_volume`, only the part that keeps cumulative volume at
    /// or below the cap is accepted; the remainder is refunded to the caller.
    pub fn contribute_for(
        &mut self,
        ctx: &CallContext,
        beneficiary: AccountId,
        amount: Amount,
        price_cap_volume: Option<Amount>,
    ) -> Result<ContributionReceipt, CampaignError> {
        let admitted = self.gate.accept(
            ctx.caller,
            beneficiary,
            amount,
            price_cap_volume,
            self.ledger.totals().total_accepted,
        )?;
        let outcome = self.ledger.record_contribution(&admitted, ctx.block)?;

        if admitted.accepted > 0 {
            self.router.forward(&admitted.sender, admitted.accepted);
        }
        if admitted.refunded > 0 {
            self.router.refund(&admitted.sender, admitted.refunded);
        }

        Ok(ContributionReceipt {
            contribution: admitted,
            period: outcome.period,
            closed: outcome.closed,
        })
    }

    /// Contribution that only accepts volume priced at `min_rate` or better.
    pub fn contribute_with_min_rate(
        &mut self,
        ctx: &CallContext,
        beneficiary: AccountId,
        amount: Amount,
        min_rate: Rate,
    ) -> Result<ContributionReceipt, CampaignError> {
        let cap = self
            .curve
            .volume_cap_for_rate(min_rate, self.ledger.totals().total_accepted)?;
        debug!(min_rate, ?cap, "rate limit resolved to volume cap");
        self.contribute_for(ctx, beneficiary, amount, cap)
    }

    /// Close the open period if its duration has elapsed at `block`.
    pub fn tick(&mut self, block: BlockHeight) -> Result<Option<PeriodIndex>, CampaignError> {
        self.ledger.tick(block)
    }

    // --- verification ---

    /// Propose `candidate` as the average rate of `index`.
    pub fn submit_average(&mut self, index: PeriodIndex, candidate: Rate) -> Result<(), CampaignError> {
        let status = self.period_or_unknown(index)?.status();
        if status != PeriodStatus::Open && !self.ledger.is_period_initialized(index) {
            return Err(CampaignError::PreviousPeriodUnverified(index));
        }

        self.ledger
            .period_mut(index)
            .ok_or(CampaignError::UnknownPeriod(index))?
            .submit_average(candidate)?;

        info!(period = index, candidate, "period average submitted");
        Ok(())
    }

    /// Advance verification of `index` by up to `step_count` batch slices.
    ///
    /// The step count is clamped to the configured per-call budget.
    pub fn verify_step(&mut self, index: PeriodIndex, step_count: usize) -> Result<StepOutcome, CampaignError> {
        let steps = step_count.min(self.config.max_verify_steps);
        let period = self
            .ledger
            .period_mut(index)
            .ok_or(CampaignError::UnknownPeriod(index))?;
        let outcome = period.verify_step(&self.curve, steps)?;

        match outcome {
            StepOutcome::Pending { processed, cursor, remaining } => {
                debug!(period = index, processed, cursor, remaining, "verification step");
            }
            StepOutcome::Verified { processed, average } => {
                info!(period = index, processed, average, "period average verified");
            }
            StepOutcome::Rejected { processed, submitted, computed } => {
                warn!(period = index, processed, submitted, computed, "period average rejected");
            }
        }
        Ok(outcome)
    }

    /// Submit `candidate` and run one verification step.
    ///
    /// If the step fails the submission is withdrawn as well.
    pub fn submit_and_verify(
        &mut self,
        index: PeriodIndex,
        candidate: Rate,
        step_count: usize,
    ) -> Result<StepOutcome, CampaignError> {
        let snapshot = {
            let p = self.period_or_unknown(index)?;
            (p.submitted_average, p.status, p.progress)
        };
        self.submit_average(index, candidate)?;

        self.verify_step(index, step_count).inspect_err(|_| {
            if let Some(p) = self.ledger.period_mut(index) {
                (p.submitted_average, p.status, p.progress) = snapshot;
            }
        })
    }

    // --- collection ---

    /// Credit `contributor`'s entitlement for the verified period `index`.
    pub fn collect(&mut self, contributor: AccountId, index: PeriodIndex) -> Result<Amount, CampaignError> {
        let period = self
            .ledger
            .period(index)
            .ok_or(CampaignError::UnknownPeriod(index))?;
        self.collection
            .collect(period, &contributor, &mut *self.issuer)
    }

    /// Tokens `contributor` could collect from `index` right now.
    pub fn entitlement(&self, contributor: &AccountId, index: PeriodIndex) -> Result<Amount, CampaignError> {
        let period = self.period_or_unknown(index)?;
        self.collection.entitlement(period, contributor)
    }

    pub fn has_collected(&self, contributor: &AccountId, index: PeriodIndex) -> bool {
        self.collection.has_collected(index, contributor)
    }

    pub fn total_issued(&self) -> Amount {
        self.collection.total_issued()
    }

    // --- reads ---

    pub fn config(&self) -> &CampaignConfig {
        &self.config
    }

    pub fn curve(&self) -> &RateCurve {
        &self.curve
    }

    pub fn totals(&self) -> &LedgerTotals {
        self.ledger.totals()
    }

    pub fn total_received(&self) -> Amount {
        self.ledger.totals().total_received
    }

    pub fn total_accepted(&self) -> Amount {
        self.ledger.totals().total_accepted
    }

    pub fn contribution_count(&self) -> u64 {
        self.ledger.totals().contribution_count
    }

    pub fn current_period_index(&self) -> PeriodIndex {
        self.ledger.current_period()
    }

    pub fn rate_at(&self, batch: u64) -> Result<Rate, CampaignError> {
        Ok(self.curve.rate_at(batch)?)
    }

    pub fn average_rate(&self, start: Amount, end: Amount) -> Result<Rate, CampaignError> {
        Ok(self.curve.average_rate(start, end)?)
    }

    pub fn period(&self, index: PeriodIndex) -> Option<&Period> {
        self.ledger.period(index)
    }

    pub fn periods(&self) -> &[Period] {
        self.ledger.periods()
    }

    pub fn is_period_initialized(&self, index: PeriodIndex) -> bool {
        self.ledger.is_period_initialized(index)
    }

    pub fn is_active(&self) -> bool {
        self.gate.is_active()
    }

    pub fn is_admin(&self, account: &AccountId) -> bool {
        self.gate.is_admin(account)
    }

    fn period_or_unknown(&self, index: PeriodIndex) -> Result<&Period, CampaignError> {
        self.ledger
            .period(index)
            .ok_or(CampaignError::UnknownPeriod(index))
    }
}
