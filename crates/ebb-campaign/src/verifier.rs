//! Resumable verification of submitted period averages.
//!
//! A period may hold more entries than one bounded call can process, and a
//! single entry may span many batches, so the true average is rebuilt in
//! steps of one batch slice each. [`ResumableSum`] is the durable state
//! between steps: a two-level cursor (entry, volume reached inside it) into
//! the append-only entry log and the exact (un-divided) weighted sum of
//! everything before it. Division happens once, after the last entry, so the
//! result is identical for any step schedule.

use ebb_core::error::{CampaignError, CurveError};
use ebb_core::types::{Amount, PeriodStatus, Rate};
use ebb_core::wide::U256;
use ebb_curve::RateCurve;
use serde::Serialize;

use crate::ledger::Period;

/// Bounded-step aggregation over an append-only log of volume ranges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResumableSum {
    cursor: usize,
    /// Volume already folded inside entry `cursor`, when partly consumed.
    resume_at: Option<Amount>,
    sum: U256,
}

impl ResumableSum {
    /// Number of log items fully folded in.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Where folding resumes inside the item at [`cursor`](Self::cursor).
    pub fn resume_at(&self) -> Option<Amount> {
        self.resume_at
    }

    /// Accumulated sum of the folded slices.
    pub fn sum(&self) -> U256 {
        self.sum
    }

    pub fn is_complete(&self, log_len: usize) -> bool {
        self.cursor >= log_len
    }

    /// Fold up to `max_steps` further slices of `log`.
    ///
    /// `range` maps an item to its `[start, end)` volume range and `slice`
    /// returns the upper bound and term of the leading slice of a non-empty
    /// range. Each slice (and each empty item) costs one step.
    ///
    /// All-or-nothing: if any slice fails or the sum overflows, the cursor
    /// and sum are left untouched. Returns the number of steps consumed.
    pub fn advance<T, R, F>(
        &mut self,
        log: &[T],
        max_steps: usize,
        mut range: R,
        mut slice: F,
    ) -> Result<usize, CurveError>
    where
        R: FnMut(&T) -> (Amount, Amount),
        F: FnMut(Amount, Amount) -> Result<(Amount, U256), CurveError>,
    {
        let mut next = *self;
        let mut steps = 0;

        while steps < max_steps && next.cursor < log.len() {
            let (start, end) = range(&log[next.cursor]);
            let from = next.resume_at.map_or(start, |at| at.max(start));
            steps += 1;

            if from >= end {
                next.cursor += 1;
                next.resume_at = None;
                continue;
            }

            let (upper, term) = slice(from, end)?;
            next.sum = next.sum.checked_add(term).ok_or(CurveError::Overflow)?;
            if upper >= end {
                next.cursor += 1;
                next.resume_at = None;
            } else {
                next.resume_at = Some(upper);
            }
        }

        *self = next;
        Ok(steps)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Result of one verification step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    /// Slices remain; call again. `cursor` counts fully folded entries.
    Pending {
        processed: usize,
        cursor: usize,
        remaining: usize,
    },
    /// The submission matched the recomputed average.
    Verified { processed: usize, average: Rate },
    /// The submission was wrong and has been discarded.
    Rejected {
        processed: usize,
        submitted: Rate,
        computed: Rate,
    },
}

impl StepOutcome {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Pending { .. })
    }
}

impl Period {
    /// Propose `candidate` as this period's average.
    pub(crate) fn submit_average(&mut self, candidate: Rate) -> Result<(), CampaignError> {
        match self.status {
            PeriodStatus::Open => Err(CampaignError::PeriodNotClosed(self.index)),
            PeriodStatus::Verifying | PeriodStatus::Verified => {
                Err(CampaignError::AlreadySubmitted(self.index))
            }
            PeriodStatus::Closed | PeriodStatus::Rejected => {
                self.submitted_average = Some(candidate);
                self.status = PeriodStatus::Verifying;
                self.progress.reset();
                Ok(())
            }
        }
    }

    /// Fold up to `step_count` batch slices and resolve once every entry is consumed.
    pub(crate) fn verify_step(
        &mut self,
        curve: &RateCurve,
        step_count: usize,
    ) -> Result<StepOutcome, CampaignError> {
        let submitted = match (self.status, self.submitted_average) {
            (PeriodStatus::Verifying, Some(candidate)) => candidate,
            (PeriodStatus::Open, _) => return Err(CampaignError::PeriodNotClosed(self.index)),
            (PeriodStatus::Verified | PeriodStatus::Rejected, _) => {
                return Err(CampaignError::AlreadyResolved(self.index));
            }
            _ => return Err(CampaignError::NothingSubmitted(self.index)),
        };

        let mut progress = self.progress;
        let processed = progress.advance(
            &self.entries,
            step_count,
            |e| (e.volume_start, e.volume_end()),
            |from, to| curve.batch_slice(from, to),
        )?;

        if !progress.is_complete(self.entries.len()) {
            self.progress = progress;
            return Ok(StepOutcome::Pending {
                processed,
                cursor: progress.cursor(),
                remaining: self.entries.len() - progress.cursor(),
            });
        }

        let computed = self.true_average(curve, progress.sum())?;
        if computed == submitted {
            self.progress = progress;
            self.verified_average = Some(submitted);
            self.status = PeriodStatus::Verified;
            Ok(StepOutcome::Verified {
                processed,
                average: submitted,
            })
        } else {
            self.progress.reset();
            self.submitted_average = None;
            self.status = PeriodStatus::Rejected;
            Ok(StepOutcome::Rejected {
                processed,
                submitted,
                computed,
            })
        }
    }

    /// `floor(sum / volume)`, or the spot rate at the boundary for an empty period.
    fn true_average(&self, curve: &RateCurve, sum: U256) -> Result<Rate, CampaignError> {
        let end = self
            .end_volume
            .ok_or(CampaignError::PeriodNotClosed(self.index))?;
        if end == self.start_volume {
            return Ok(curve.spot_rate(self.start_volume)?);
        }
        Ok(sum
            .checked_div_u128(end - self.start_volume)
            .ok_or(CurveError::Overflow)?)
    }
}
