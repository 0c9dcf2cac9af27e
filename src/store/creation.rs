//! Creation store contract and in-memory implementation
//!
//! An append-only record store plus a content-addressed blob store. Both
//! write paths are conflict-free under concurrent writers; nothing here is
//! ever updated in place.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;
use crate::store::UserId;

/// Days after which consumers treat a creation record as expired.
/// Enforcement (actual deletion) lives outside this service.
pub const CREATION_TTL_DAYS: i64 = 7;

/// A persisted reference to a generated result
#[derive(Debug, Clone, Serialize)]
pub struct Creation {
    pub id: String,
    pub owner: UserId,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

impl Creation {
    /// Whether the record is past the retention window as of `now`
    pub fn is_expired(&self, now: DateTime<Utc>, ttl_days: i64) -> bool {
        now - self.created_at > Duration::days(ttl_days)
    }
}

/// Append-only record store plus blob store for generated results
#[async_trait]
pub trait CreationStore: Send + Sync {
    /// Store result bytes and return a stable URL for them
    async fn upload_blob(&self, owner: &UserId, bytes: &[u8], extension: &str) -> Result<String>;

    /// Append a creation record and return its id
    async fn append_record(
        &self,
        owner: &UserId,
        image_url: &str,
        created_at: DateTime<Utc>,
    ) -> Result<String>;

    /// All records owned by a user, newest first
    async fn query_by_owner(&self, owner: &UserId) -> Result<Vec<Creation>>;
}

/// In-memory creation store
#[derive(Default)]
pub struct MemoryCreationStore {
    blobs: DashMap<String, Vec<u8>>,
    records: DashMap<UserId, Vec<Creation>>,
}

impl MemoryCreationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch stored blob bytes by URL; test and debugging accessor
    pub fn blob(&self, url: &str) -> Option<Vec<u8>> {
        self.blobs.get(url).map(|b| b.clone())
    }

    pub fn blob_count(&self) -> usize {
        self.blobs.len()
    }
}

#[async_trait]
impl CreationStore for MemoryCreationStore {
    async fn upload_blob(&self, owner: &UserId, bytes: &[u8], extension: &str) -> Result<String> {
        let url = format!(
            "memory://creations/{}/{}.{}",
            owner,
            Uuid::new_v4(),
            extension
        );
        self.blobs.insert(url.clone(), bytes.to_vec());
        debug!(owner = %owner, url = %url, size = bytes.len(), "Uploaded blob");
        Ok(url)
    }

    async fn append_record(
        &self,
        owner: &UserId,
        image_url: &str,
        created_at: DateTime<Utc>,
    ) -> Result<String> {
        let record = Creation {
            id: Uuid::new_v4().to_string(),
            owner: owner.clone(),
            image_url: image_url.to_string(),
            created_at,
        };
        let id = record.id.clone();
        self.records.entry(owner.clone()).or_default().push(record);
        debug!(owner = %owner, id = %id, "Appended creation record");
        Ok(id)
    }

    async fn query_by_owner(&self, owner: &UserId) -> Result<Vec<Creation>> {
        let mut records = self
            .records
            .get(owner)
            .map(|r| r.clone())
            .unwrap_or_default();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}
