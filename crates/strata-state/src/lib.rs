//! Strata State
//!
//! This crate provides the state storage trait and implementations. State
//! maps each applied resource to its provider id, last-applied properties
//! and outputs, and persists across runs.
//!
//! The [`StateStore`] trait defines:
//! - Loading the full prior state at the start of a run
//! - Committing one resource's record after a successful provider call
//! - Removing a resource's record after it is deleted
//!
//! Each commit is atomic for its resource. Backends:
//! - [`SqliteStateStore`]: one row per resource
//! - [`FsStateStore`]: one JSON document per resource
//! - [`MemoryStateStore`]: process-local, for previews and tests

mod fs;
mod memory;
mod sqlite;
mod types;

pub use fs::FsStateStore;
pub use memory::MemoryStateStore;
pub use sqlite::SqliteStateStore;
pub use types::{JsonMap, PriorState, StateRecord};

use async_trait::async_trait;
use strata_config::{ResourceId, ResourceIdError};

/// Error type for state operations.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
  /// A database error occurred.
  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),

  /// Schema migration failed.
  #[error("migration error: {0}")]
  Migrate(#[from] sqlx::migrate::MigrateError),

  /// A filesystem error occurred.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  /// A record could not be encoded or decoded.
  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  /// A stored key is not a valid resource id.
  #[error("corrupt state entry: {0}")]
  InvalidId(#[from] ResourceIdError),
}

/// Persistent mapping from resource id to [`StateRecord`].
#[async_trait]
pub trait StateStore: Send + Sync {
  /// Load every record.
  async fn load(&self) -> Result<PriorState, StateError>;

  /// Insert or replace the record for `id`.
  ///
  /// Once this returns, the record survives a restart.
  async fn commit(&self, id: &ResourceId, record: &StateRecord) -> Result<(), StateError>;

  /// Remove the record for `id`. Removing a missing record is not an error.
  async fn remove(&self, id: &ResourceId) -> Result<(), StateError>;
}
