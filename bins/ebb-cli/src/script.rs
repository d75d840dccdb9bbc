//! Replay of JSON contribution scripts against an in-memory campaign.
//!
//! A script is `{ "config": {...}?, "steps": [...] }` where every step is an
//! externally tagged object such as `{ "contribute": { "caller": "0x..",
//! "block": 3, "amount": 15000000000000000000 } }`. Amounts and rates are
//! base units. A `submit` without `average` submits the true average, the
//! way an honest operator would.

use anyhow::{Context, Result};
use ebb_campaign::{Campaign, CampaignConfig, ContributionReceipt, Period, StepOutcome};
use ebb_core::error::CampaignError;
use ebb_core::types::{
    AccountId, Amount, BlockHeight, CallContext, LedgerTotals, PeriodIndex, Rate,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    #[serde(default)]
    pub config: Option<CampaignConfig>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum Step {
    Contribute {
        caller: AccountId,
        block: BlockHeight,
        amount: Amount,
        #[serde(default)]
        beneficiary: Option<AccountId>,
        /// Cumulative-volume ceiling.
        #[serde(default)]
        cap: Option<Amount>,
        /// Worst acceptable rate; converted to a volume ceiling.
        #[serde(default)]
        min_rate: Option<Rate>,
    },
    Tick {
        block: BlockHeight,
    },
    Halt {
        caller: AccountId,
        block: BlockHeight,
    },
    Resume {
        caller: AccountId,
        block: BlockHeight,
    },
    Submit {
        period: PeriodIndex,
        #[serde(default)]
        average: Option<Rate>,
    },
    Verify {
        period: PeriodIndex,
        steps: usize,
    },
    Collect {
        contributor: AccountId,
        period: PeriodIndex,
    },
}

impl Step {
    fn name(&self) -> &'static str {
        match self {
            Self::Contribute { .. } => "contribute",
            Self::Tick { .. } => "tick",
            Self::Halt { .. } => "halt",
            Self::Resume { .. } => "resume",
            Self::Submit { .. } => "submit",
            Self::Verify { .. } => "verify",
            Self::Collect { .. } => "collect",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepResult {
    Contributed(ContributionReceipt),
    Ticked { closed: Option<PeriodIndex> },
    Toggled { active: bool },
    Submitted { average: Rate },
    Verification(StepOutcome),
    Collected { tokens: Amount },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: usize,
    pub op: &'static str,
    pub result: StepResult,
}

/// Final state after replaying a script.
#[derive(Debug, Serialize)]
pub struct Report {
    pub outcomes: Vec<StepReport>,
    pub totals: LedgerTotals,
    pub active: bool,
    pub payout_balance: Amount,
    pub total_issued: Amount,
    pub periods: Vec<Period>,
}

impl Report {
    pub fn failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.result, StepResult::Failed { .. }))
            .count()
    }
}

impl Script {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("malformed simulation script")
    }

    /// Replay every step. Failed steps are reported and skipped unless
    /// `strict`, in which case the first failure aborts the run.
    pub fn run(&self, fallback: &CampaignConfig, strict: bool) -> Result<Report> {
        let config = self.config.clone().unwrap_or_else(|| fallback.clone());
        let (mut campaign, router, _issuer) = Campaign::with_memory_collaborators(config)
            .context("failed to start campaign")?;

        let mut outcomes = Vec::with_capacity(self.steps.len());
        for (i, step) in self.steps.iter().enumerate() {
            let result = match apply(&mut campaign, step) {
                Ok(result) => result,
                Err(e) if strict => {
                    return Err(e).with_context(|| format!("step {i} ({}) failed", step.name()));
                }
                Err(e) => {
                    warn!(step = i, op = step.name(), error = %e, "step failed");
                    StepResult::Failed { error: e.to_string() }
                }
            };
            debug!(step = i, op = step.name(), "step applied");
            outcomes.push(StepReport {
                step: i,
                op: step.name(),
                result,
            });
        }

        Ok(Report {
            outcomes,
            totals: *campaign.totals(),
            active: campaign.is_active(),
            payout_balance: router.payout_balance(),
            total_issued: campaign.total_issued(),
            periods: campaign.periods().to_vec(),
        })
    }
}

fn apply(campaign: &mut Campaign, step: &Step) -> Result<StepResult, CampaignError> {
    match *step {
        Step::Contribute {
            caller,
            block,
            amount,
            beneficiary,
            cap,
            min_rate,
        } => {
            let ctx = CallContext::new(caller, block);
            let beneficiary = beneficiary.unwrap_or(caller);
            let receipt = match min_rate {
                Some(rate) => campaign.contribute_with_min_rate(&ctx, beneficiary, amount, rate)?,
                None => campaign.contribute_for(&ctx, beneficiary, amount, cap)?,
            };
            Ok(StepResult::Contributed(receipt))
        }
        Step::Tick { block } => Ok(StepResult::Ticked {
            closed: campaign.tick(block)?,
        }),
        Step::Halt { caller, block } => {
            campaign.halt(&CallContext::new(caller, block))?;
            Ok(StepResult::Toggled { active: false })
        }
        Step::Resume { caller, block } => {
            campaign.resume(&CallContext::new(caller, block))?;
            Ok(StepResult::Toggled { active: true })
        }
        Step::Submit { period, average } => {
            let average = match average {
                Some(average) => average,
                None => true_average(campaign, period)?,
            };
            campaign.submit_average(period, average)?;
            Ok(StepResult::Submitted { average })
        }
        Step::Verify { period, steps } => Ok(StepResult::Verification(campaign.verify_step(period, steps)?)),
        Step::Collect {
            contributor,
            period,
        } => Ok(StepResult::Collected {
            tokens: campaign.collect(contributor, period)?,
        }),
    }
}

/// Average rate over a closed period's volume range, computed off-ledger.
pub fn true_average(campaign: &Campaign, index: PeriodIndex) -> Result<Rate, CampaignError> {
    let period = campaign
        .period(index)
        .ok_or(CampaignError::UnknownPeriod(index))?;
    let end = period
        .end_volume()
        .ok_or(CampaignError::PeriodNotClosed(index))?;
    let start = period.start_volume();
    if end == start {
        Ok(campaign.curve().spot_rate(start)?)
    } else {
        campaign.average_rate(start, end)
    }
}
