//! Profile store contract and in-memory implementation

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::store::{ProfileField, UserId, UserProfile};

/// Document store holding one mutable profile per user
///
/// `atomic_increment` is the only way this service writes the credit balance:
/// a server-side signed delta, never a read-modify-write of a cached value,
/// so concurrent settlements for the same user cannot lose updates.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, user_id: &UserId) -> Result<Option<UserProfile>>;

    /// Insert a profile only if none exists. Returns whether it was created.
    async fn create(&self, user_id: &UserId, profile: UserProfile) -> Result<bool>;

    /// Apply a signed delta to a numeric field and return the new value
    async fn atomic_increment(
        &self,
        user_id: &UserId,
        field: ProfileField,
        delta: i64,
    ) -> Result<i64>;

    /// Live change subscription; the receiver sees every profile mutation
    fn subscribe(&self, user_id: &UserId) -> watch::Receiver<Option<UserProfile>>;
}

/// Bootstrap a profile on first sign-in, granting the starting balance once
///
/// The grant is guarded by the store's create-if-absent semantics: a second
/// call for the same user leaves the existing balance untouched.
pub async fn ensure_profile(
    store: &dyn ProfileStore,
    user_id: &UserId,
    display_name: &str,
    email: &str,
    starting_credits: i64,
) -> Result<UserProfile> {
    let seed = UserProfile {
        display_name: display_name.to_string(),
        email: email.to_string(),
        avatar_url: None,
        credits: starting_credits,
    };

    if store.create(user_id, seed).await? {
        info!(user = %user_id, credits = starting_credits, "Bootstrapped new profile");
    }

    store
        .get(user_id)
        .await?
        .ok_or_else(|| AppError::ProfileNotFound(user_id.to_string()))
}

/// In-memory profile store
///
/// Mutations take the dashmap shard write lock for the duration of the
/// update, which gives `atomic_increment` the required counter semantics
/// under concurrent writers.
#[derive(Default)]
pub struct MemoryProfileStore {
    profiles: DashMap<UserId, UserProfile>,
    watchers: DashMap<UserId, watch::Sender<Option<UserProfile>>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn notify(&self, user_id: &UserId, profile: Option<UserProfile>) {
        if let Some(tx) = self.watchers.get(user_id) {
            let _ = tx.send(profile);
        }
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get(&self, user_id: &UserId) -> Result<Option<UserProfile>> {
        Ok(self.profiles.get(user_id).map(|p| p.clone()))
    }

    async fn create(&self, user_id: &UserId, profile: UserProfile) -> Result<bool> {
        let created = match self.profiles.entry(user_id.clone()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(profile.clone());
                Some(profile)
            }
        };

        match created {
            Some(profile) => {
                self.notify(user_id, Some(profile));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn atomic_increment(
        &self,
        user_id: &UserId,
        field: ProfileField,
        delta: i64,
    ) -> Result<i64> {
        let updated = {
            let mut entry = self
                .profiles
                .get_mut(user_id)
                .ok_or_else(|| AppError::ProfileNotFound(user_id.to_string()))?;
            match field {
                ProfileField::Credits => entry.credits += delta,
            }
            entry.clone()
        };

        let value = match field {
            ProfileField::Credits => updated.credits,
        };
        debug!(user = %user_id, delta, value, "Applied atomic increment");
        self.notify(user_id, Some(updated));
        Ok(value)
    }

    fn subscribe(&self, user_id: &UserId) -> watch::Receiver<Option<UserProfile>> {
        let tx = self.watchers.entry(user_id.clone()).or_insert_with(|| {
            let current = self.profiles.get(user_id).map(|p| p.clone());
            watch::channel(current).0
        });
        tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(credits: i64) -> UserProfile {
        UserProfile {
            display_name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            avatar_url: None,
            credits,
        }
    }

    #[tokio::test]
    async fn test_create_is_once_only() {
        let store = MemoryProfileStore::new();
        let user = UserId::from("u1");

        assert!(store.create(&user, profile(30)).await.unwrap());
        assert!(!store.create(&user, profile(999)).await.unwrap());

        let stored = store.get(&user).await.unwrap().unwrap();
        assert_eq!(stored.credits, 30);
    }

    #[tokio::test]
    async fn test_ensure_profile_grants_starting_balance_once() {
        let store = MemoryProfileStore::new();
        let user = UserId::from("u1");

        let first = ensure_profile(&store, &user, "Ada", "ada@example.com", 30)
            .await
            .unwrap();
        assert_eq!(first.credits, 30);

        store
            .atomic_increment(&user, ProfileField::Credits, -3)
            .await
            .unwrap();

        let second = ensure_profile(&store, &user, "Ada", "ada@example.com", 30)
            .await
            .unwrap();
        assert_eq!(second.credits, 27);
    }

    #[tokio::test]
    async fn test_atomic_increment_missing_profile() {
        let store = MemoryProfileStore::new();
        let err = store
            .atomic_increment(&UserId::from("ghost"), ProfileField::Credits, -3)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ProfileNotFound(_)));
    }

    #[tokio::test]
    async fn test_subscribe_sees_increments() {
        let store = MemoryProfileStore::new();
        let user = UserId::from("u1");
        store.create(&user, profile(30)).await.unwrap();

        let mut rx = store.subscribe(&user);
        assert_eq!(rx.borrow().as_ref().unwrap().credits, 30);

        store
            .atomic_increment(&user, ProfileField::Credits, -3)
            .await
            .unwrap();

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().as_ref().unwrap().credits, 27);
    }

    #[tokio::test]
    async fn test_concurrent_increments_do_not_lose_updates() {
        use std::sync::Arc;

        let store = Arc::new(MemoryProfileStore::new());
        let user = UserId::from("u1");
        store.create(&user, profile(30)).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let store = store.clone();
            let user = user.clone();
            handles.push(tokio::spawn(async move {
                store
                    .atomic_increment(&user, ProfileField::Credits, -3)
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let stored = store.get(&user).await.unwrap().unwrap();
        assert_eq!(stored.credits, 0);
    }
}
