//! Shared helpers for the end-to-end and adversarial suites.

use ebb_campaign::{Campaign, CampaignConfig, MemoryIssuer, MemoryRouter, StepOutcome};
use ebb_core::constants::UNIT;
use ebb_core::types::{AccountId, Amount, BlockHeight, CallContext, PeriodIndex, Rate};

/// Account from a seed byte.
pub fn acct(seed: u8) -> AccountId {
    AccountId([seed; 20])
}

/// The campaign administrator used by every helper-built campaign.
pub fn admin() -> AccountId {
    acct(0xAD)
}

pub fn ctx(caller: AccountId, block: BlockHeight) -> CallContext {
    CallContext::new(caller, block)
}

/// Whole units to base units.
pub fn units(n: u128) -> Amount {
    n * UNIT
}

/// Default deployment administered by [`admin`].
pub fn config() -> CampaignConfig {
    CampaignConfig {
        admin: admin(),
        ..CampaignConfig::default()
    }
}

/// A campaign on the default config plus handles to its collaborators.
pub fn campaign() -> (Campaign, MemoryRouter, MemoryIssuer) {
    campaign_with(|_| {})
}

/// Like [`campaign`] with a tweaked config.
pub fn campaign_with(tweak: impl FnOnce(&mut CampaignConfig)) -> (Campaign, MemoryRouter, MemoryIssuer) {
    let mut cfg = config();
    tweak(&mut cfg);
    Campaign::with_memory_collaborators(cfg).expect("helper config is valid")
}

/// The true average of a closed period, computed straight from the curve.
pub fn true_average(c: &Campaign, index: PeriodIndex) -> Rate {
    let p = c.period(index).expect("period exists");
    let end = p.end_volume().expect("period is closed");
    if end == p.start_volume() {
        c.curve().spot_rate(end).expect("spot rate")
    } else {
        c.average_rate(p.start_volume(), end).expect("average rate")
    }
}

/// Drive verification of `index` to resolution in chunks of `step`.
pub fn run_verification(c: &mut Campaign, index: PeriodIndex, step: usize) -> StepOutcome {
    loop {
        let out = c.verify_step(index, step).expect("verification step");
        if out.is_resolved() {
            return out;
        }
    }
}

/// Submit the true average of `index` and verify it completely.
pub fn settle(c: &mut Campaign, index: PeriodIndex) -> Rate {
    let avg = true_average(c, index);
    c.submit_average(index, avg).expect("submission accepted");
    match run_verification(c, index, usize::MAX) {
        StepOutcome::Verified { average, .. } => average,
        other => panic!("period {index} did not verify: {other:?}"),
    }
}
