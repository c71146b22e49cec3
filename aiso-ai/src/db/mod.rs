//! Sample persistence
//!
//! One [`SampleStore`] is chosen at startup by [`open_store`]: the SQLite
//! store when the database file can be opened, otherwise the in-memory store
//! with a warning. Both variants honour the same contracts, including search
//! ranking and ordering.

pub mod memory;
pub mod sqlite;
pub mod tags;

use aiso_common::Result;
use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{NewSample, Sample, SampleUpdate, TagAssignment};

pub use memory::MemorySampleStore;
pub use sqlite::SqliteSampleStore;

/// Whether stored samples survive a restart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Durable,
    Ephemeral,
}

/// Persistence contract shared by the durable and ephemeral stores
#[async_trait]
pub trait SampleStore: Send + Sync {
    fn kind(&self) -> StorageKind;

    /// Create, or replace the record with the same path
    async fn save_sample(&self, sample: NewSample) -> Result<Sample>;

    async fn get_sample(&self, id: Uuid) -> Result<Option<Sample>>;

    /// All samples, newest first
    async fn list_samples(&self) -> Result<Vec<Sample>>;

    /// Merge `update` into an existing record; unknown id is `Error::NotFound`
    async fn update_sample(&self, id: Uuid, update: SampleUpdate) -> Result<Sample>;

    /// Append `tag` unless already present, atomically with respect to other
    /// writers; `tag` must already be trimmed and non-empty
    async fn add_tag(&self, id: Uuid, tag: &str) -> Result<TagAssignment>;

    /// Returns whether a record existed
    async fn delete_sample(&self, id: Uuid) -> Result<bool>;

    /// Ranked substring search over name, category, tags and description
    async fn search_samples(&self, query: &str) -> Result<Vec<Sample>>;

    async fn samples_by_category(&self, category: &str) -> Result<Vec<Sample>>;

    /// Samples whose tag list contains exactly `tag`
    async fn samples_by_tag(&self, tag: &str) -> Result<Vec<Sample>>;

    /// Increment the play counter and stamp `last_played`
    async fn record_play(&self, id: Uuid) -> Result<Sample>;
}

/// Store selected at startup plus the reason it is ephemeral, if it is
pub struct OpenedStore {
    pub store: Arc<dyn SampleStore>,
    pub warning: Option<String>,
}

/// Open the SQLite store at `db_path`, falling back to memory on failure
pub async fn open_store(db_path: &Path) -> OpenedStore {
    match SqliteSampleStore::open(db_path).await {
        Ok(store) => {
            tracing::info!(path = %db_path.display(), "Sample database opened");
            OpenedStore {
                store: Arc::new(store),
                warning: None,
            }
        }
        Err(e) => {
            let warning = format!(
                "Sample database unavailable ({}); samples will not survive a restart",
                e
            );
            tracing::warn!(path = %db_path.display(), error = %e, "Falling back to in-memory sample store");
            OpenedStore {
                store: Arc::new(MemorySampleStore::new()),
                warning: Some(warning),
            }
        }
    }
}

/// Initialize database connection pool
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    sqlite::init_tables(&pool).await?;

    Ok(pool)
}

/// Current time at the precision stored on disk
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Search rank: name 1, category 2, tag 3, description 4
///
/// `needle` must already be ASCII-lowercased. SQLite `LOWER()` only folds
/// ASCII, so the in-memory store folds the same way.
pub(crate) fn search_rank(sample: &Sample, needle: &str) -> Option<u8> {
    let contains = |value: &str| value.to_ascii_lowercase().contains(needle);

    if contains(sample.name.as_str()) {
        Some(1)
    } else if sample.category.as_deref().is_some_and(contains) {
        Some(2)
    } else if sample.tags.iter().any(|tag| contains(tag.as_str())) {
        Some(3)
    } else if sample.description.as_deref().is_some_and(contains) {
        Some(4)
    } else {
        None
    }
}

/// Newest first, ties broken by path
pub(crate) fn newest_first(a: &Sample, b: &Sample) -> std::cmp::Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| a.path.cmp(&b.path))
}
