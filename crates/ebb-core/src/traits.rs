//! Trait interfaces for the collaborators around the campaign engine.
//!
//! - [`Authorizer`]: decides which callers may run admin operations
//! - [`ValueRouter`]: moves accepted value to the payout destination and
//!   refused value back to its sender
//! - [`TokenIssuer`]: credits collected entitlements

use crate::types::{AccountId, Amount};

/// Capability predicate over caller identity for admin-gated operations.
pub trait Authorizer: Send + Sync {
    /// Whether `caller` may halt or resume the campaign.
    fn is_admin(&self, caller: &AccountId) -> bool;
}

/// The classic single-admin policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingleAdmin(pub AccountId);

impl Authorizer for SingleAdmin {
    fn is_admin(&self, caller: &AccountId) -> bool {
        *caller == self.0
    }
}

/// Destination for contributed value.
///
/// Both operations are assumed infallible: the payout destination accepts
/// forwarded value unconditionally and refunds always reach the sender.
pub trait ValueRouter: Send {
    /// Forward accepted value from `from` to the payout destination.
    fn forward(&mut self, from: &AccountId, amount: Amount);

    /// Return refused value to `to`.
    fn refund(&mut self, to: &AccountId, amount: Amount);
}

/// Token-issuing collaborator that credits verified entitlements.
pub trait TokenIssuer: Send {
    /// Credit `amount` tokens to `to`.
    fn credit(&mut self, to: &AccountId, amount: Amount);
}
