//! Cumulative-volume ledger organized into clearance periods.
//!
//! Periods are closed strictly by elapsed block count. The check runs before
//! a contribution is applied, so the contribution that notices the elapsed
//! duration belongs to the newly opened period. Idle stretches are handled
//! with [`PeriodLedger::tick`].

use ebb_core::error::{CampaignError, CurveError};
use ebb_core::types::{
    AcceptedContribution, AccountId, Amount, BlockHeight, ContributionEntry, LedgerTotals,
    PeriodIndex, PeriodStatus, Rate,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::verifier::ResumableSum;

/// One clearance period and its append-only contribution log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Period {
    pub(crate) index: PeriodIndex,
    pub(crate) start_block: BlockHeight,
    pub(crate) start_volume: Amount,
    pub(crate) end_volume: Option<Amount>,
    pub(crate) submitted_average: Option<Rate>,
    pub(crate) verified_average: Option<Rate>,
    pub(crate) status: PeriodStatus,
    pub(crate) progress: ResumableSum,
    pub(crate) entries: Vec<ContributionEntry>,
}

impl Period {
    fn open(index: PeriodIndex, start_block: BlockHeight, start_volume: Amount) -> Self {
        Self {
            index,
            start_block,
            start_volume,
            end_volume: None,
            submitted_average: None,
            verified_average: None,
            status: PeriodStatus::Open,
            progress: ResumableSum::default(),
            entries: Vec::new(),
        }
    }

    pub fn index(&self) -> PeriodIndex {
        self.index
    }

    pub fn start_block(&self) -> BlockHeight {
        self.start_block
    }

    pub fn start_volume(&self) -> Amount {
        self.start_volume
    }

    /// Exclusive upper volume boundary; `None` while the period is open.
    pub fn end_volume(&self) -> Option<Amount> {
        self.end_volume
    }

    pub fn submitted_average(&self) -> Option<Rate> {
        self.submitted_average
    }

    pub fn verified_average(&self) -> Option<Rate> {
        self.verified_average
    }

    pub fn status(&self) -> PeriodStatus {
        self.status
    }

    /// Number of entries already consumed by verification.
    pub fn verification_cursor(&self) -> usize {
        self.progress.cursor()
    }

    pub fn entries(&self) -> &[ContributionEntry] {
        &self.entries
    }

    /// Total volume of a closed period.
    pub fn volume(&self) -> Option<Amount> {
        self.end_volume.map(|end| end - self.start_volume)
    }

    /// Sum of `contributor`'s entry amounts in this period.
    pub fn contributed_by(&self, contributor: &AccountId) -> Amount {
        self.entries
            .iter()
            .filter(|e| e.contributor == *contributor)
            .map(|e| e.amount)
            .sum()
    }

    fn close(&mut self, end_volume: Amount) {
        self.end_volume = Some(end_volume);
        self.status = PeriodStatus::Closed;
    }
}

/// Outcome of recording one admitted contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordOutcome {
    /// Period the contribution was recorded in.
    pub period: PeriodIndex,
    /// The appended entry; `None` when the price cap refused everything.
    pub entry: Option<ContributionEntry>,
    /// Period closed by the rollover check preceding this contribution.
    pub closed: Option<PeriodIndex>,
}

/// Running totals plus every period since genesis.
#[derive(Debug, Clone)]
pub struct PeriodLedger {
    duration: u64,
    periods: Vec<Period>,
    totals: LedgerTotals,
}

impl PeriodLedger {
    /// Open period 0 at `start_block`.
    pub fn new(start_block: BlockHeight, duration: u64) -> Self {
        Self {
            duration,
            periods: vec![Period::open(0, start_block, 0)],
            totals: LedgerTotals {
                period_start_block: start_block,
                ..LedgerTotals::default()
            },
        }
    }

    pub fn totals(&self) -> &LedgerTotals {
        &self.totals
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }

    /// Index of the open period.
    pub fn current_period(&self) -> PeriodIndex {
        self.totals.current_period_index
    }

    pub fn period(&self, index: PeriodIndex) -> Option<&Period> {
        usize::try_from(index).ok().and_then(|i| self.periods.get(i))
    }

    pub(crate) fn period_mut(&mut self, index: PeriodIndex) -> Option<&mut Period> {
        usize::try_from(index).ok().and_then(|i| self.periods.get_mut(i))
    }

    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    /// Whether `index` may receive an average submission: period 0 always,
    /// any later period once its predecessor is verified.
    pub fn is_period_initialized(&self, index: PeriodIndex) -> bool {
        match index.checked_sub(1) {
            None => self.period(0).is_some(),
            Some(prev) => self
                .period(prev)
                .is_some_and(|p| p.status == PeriodStatus::Verified),
        }
    }

    /// Block at which the open period's duration has elapsed.
    pub fn period_deadline(&self) -> BlockHeight {
        self.totals.period_start_block.saturating_add(self.duration)
    }

    fn check_block(&self, block: BlockHeight) -> Result<(), CampaignError> {
        if block < self.totals.period_start_block {
            return Err(CampaignError::StaleBlock {
                block,
                period_start: self.totals.period_start_block,
            });
        }
        Ok(())
    }

    /// Close the open period if its duration has elapsed at `block`.
    ///
    /// Returns the index of the period that was closed, if any.
    pub fn tick(&mut self, block: BlockHeight) -> Result<Option<PeriodIndex>, CampaignError> {
        self.check_block(block)?;
        Ok(self.roll_if_elapsed(block))
    }

    fn roll_if_elapsed(&mut self, block: BlockHeight) -> Option<PeriodIndex> {
        if block < self.period_deadline() {
            return None;
        }

        let end_volume = self.totals.total_accepted;
        let closed = self.totals.current_period_index;
        let next = closed + 1;

        if let Some(period) = self.period_mut(closed) {
            period.close(end_volume);
        }
        self.periods.push(Period::open(next, block, end_volume));
        self.totals.current_period_index = next;
        self.totals.period_start_block = block;

        info!(
            period = closed,
            end_volume,
            next_period = next,
            start_block = block,
            "clearance period closed"
        );
        Some(closed)
    }

    /// Record an admitted contribution at `block`.
    ///
    /// Rolls the period first if its duration has elapsed. A contribution
    /// whose accepted portion is zero is counted but leaves no entry.
    pub fn record_contribution(
        &mut self,
        contribution: &AcceptedContribution,
        block: BlockHeight,
    ) -> Result<RecordOutcome, CampaignError> {
        self.check_block(block)?;

        let total_received = self
            .totals
            .total_received
            .checked_add(contribution.received)
            .ok_or(CurveError::Overflow)?;
        let total_accepted = self
            .totals
            .total_accepted
            .checked_add(contribution.accepted)
            .ok_or(CurveError::Overflow)?;
        let contribution_count = self
            .totals
            .contribution_count
            .checked_add(1)
            .ok_or(CurveError::Overflow)?;

        let closed = self.roll_if_elapsed(block);
        let period = self.totals.current_period_index;

        let entry = (contribution.accepted > 0).then(|| ContributionEntry {
            contributor: contribution.beneficiary,
            amount: contribution.accepted,
            volume_start: self.totals.total_accepted,
        });
        if let (Some(entry), Some(open)) = (entry, self.period_mut(period)) {
            open.entries.push(entry);
        }

        self.totals.total_received = total_received;
        self.totals.total_accepted = total_accepted;
        self.totals.contribution_count = contribution_count;

        debug!(
            period,
            beneficiary = %contribution.beneficiary,
            accepted = contribution.accepted,
            refunded = contribution.refunded,
            total_accepted,
            "contribution recorded"
        );

        Ok(RecordOutcome {
            period,
            entry,
            closed,
        })
    }
}
