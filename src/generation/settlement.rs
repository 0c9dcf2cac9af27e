//! Credit settlement - authorization check and atomic balance decrement

use crate::error::Result;
use crate::store::profile::ProfileStore;
use crate::store::{ProfileField, UserId};

/// Fixed number of credits charged per successful generation
pub const GENERATION_COST: u32 = 3;

/// Starting balance granted once on first sign-in
pub const STARTING_CREDITS: i64 = 30;

/// True iff the balance covers the cost. Pure; no store access.
pub fn authorize(balance: i64, cost: u32) -> bool {
    balance >= i64::from(cost)
}

/// Apply the charge for one successful generation
///
/// A single atomic signed decrement against the profile store; never a
/// read-modify-write of a cached balance. Not idempotent on its own -
/// callers invoke it at most once per successful synthesis.
pub async fn settle(store: &dyn ProfileStore, user_id: &UserId, cost: u32) -> Result<i64> {
    store
        .atomic_increment(user_id, ProfileField::Credits, -i64::from(cost))
        .await
}

/// Outcome of the detached settlement/persistence task
///
/// Both halves run strictly after the caller already has their image, so
/// failures recorded here are operational concerns, never generation
/// failures.
#[derive(Debug, Default, Clone)]
pub struct SettlementReport {
    /// Whether the balance decrement went through
    pub charged: bool,
    /// Balance after the charge, when it went through
    pub balance_after: Option<i64>,
    /// Id of the appended creation record, when persistence succeeded
    pub creation_id: Option<String>,
    /// `SettlementFailed` detail; logged, not surfaced
    pub settlement_error: Option<String>,
    /// `PersistenceFailed` detail after bounded retries; logged, not surfaced
    pub persistence_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::profile::MemoryProfileStore;
    use crate::store::UserProfile;

    #[test]
    fn test_authorize_boundary() {
        assert!(authorize(3, GENERATION_COST));
        assert!(authorize(30, GENERATION_COST));
        assert!(!authorize(2, GENERATION_COST));
        assert!(!authorize(0, GENERATION_COST));
        assert!(!authorize(-1, GENERATION_COST));
    }

    #[tokio::test]
    async fn test_settle_decrements_exactly_once() {
        let store = MemoryProfileStore::new();
        let user = UserId::from("u1");
        store
            .create(
                &user,
                UserProfile {
                    display_name: "Ada".to_string(),
                    email: "ada@example.com".to_string(),
                    avatar_url: None,
                    credits: 30,
                },
            )
            .await
            .unwrap();

        let balance = settle(&store, &user, GENERATION_COST).await.unwrap();
        assert_eq!(balance, 27);
    }
}
