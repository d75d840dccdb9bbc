//! # ebb-campaign
//!
//! The stateful side of the Ebb engine:
//! - [`gate::AdmissionGate`]: halt flag, minimum floor, price caps
//! - [`ledger::PeriodLedger`]: cumulative volume and clearance periods
//! - [`verifier`]: resumable, bounded-step verification of period averages
//! - [`collection::CollectionManager`]: one-shot payout of verified entitlements
//! - [`campaign::Campaign`]: composes the above behind one operation surface
//! - [`config::CampaignConfig`]: deployment parameters

pub mod campaign;
pub mod collection;
pub mod config;
pub mod gate;
pub mod ledger;
pub mod memory;
pub mod verifier;

pub use campaign::{Campaign, ContributionReceipt};
pub use config::CampaignConfig;
pub use ledger::{Period, PeriodLedger};
pub use memory::{MemoryIssuer, MemoryRouter};
pub use verifier::{ResumableSum, StepOutcome};
