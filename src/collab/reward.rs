use futures::future::BoxFuture;

use crate::dao::models::UserId;

/// Reputation-point award transport.
///
/// Fire-and-forget: the core only learns success or failure, and a failure is
/// recorded in the winner history rather than retried or surfaced.
pub trait RewardPort: Send + Sync {
    /// Award `amount` points to a user; `false` means the award did not land.
    fn award(&self, user: UserId, amount: i64) -> BoxFuture<'static, bool>;
}
