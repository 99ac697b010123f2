use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use strata_config::ResourceId;
use tracing::debug;

use crate::{PriorState, StateError, StateRecord, StateStore};

/// SQLite-based state store.
///
/// One row per resource. Commits are single upsert statements, so each one is
/// atomic on its own.
pub struct SqliteStateStore {
  pool: SqlitePool,
}

impl SqliteStateStore {
  /// Create a new SQLite state store with the given connection pool.
  ///
  /// Call [`migrate`](Self::migrate) before first use.
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }

  /// Open (creating if needed) a database file and run migrations.
  pub async fn connect(path: impl AsRef<std::path::Path>) -> Result<Self, StateError> {
    let options = SqliteConnectOptions::new()
      .filename(path)
      .create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    let store = Self::new(pool);
    store.migrate().await?;
    Ok(store)
  }

  /// A private in-memory database, for tests.
  pub async fn in_memory() -> Result<Self, StateError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
    // Every connection to :memory: is a separate database.
    let pool = SqlitePoolOptions::new()
      .max_connections(1)
      .connect_with(options)
      .await?;
    let store = Self::new(pool);
    store.migrate().await?;
    Ok(store)
  }

  /// Run database migrations.
  pub async fn migrate(&self) -> Result<(), StateError> {
    sqlx::migrate!("./migrations").run(&self.pool).await?;
    Ok(())
  }

  fn decode(row: &SqliteRow) -> Result<(ResourceId, StateRecord), StateError> {
    let id: String = row.try_get("resource_id")?;
    let properties: String = row.try_get("properties")?;
    let inputs: String = row.try_get("inputs")?;
    let outputs: String = row.try_get("outputs")?;
    let dependencies: String = row.try_get("dependencies")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

    let record = StateRecord {
      provider_id: row.try_get("provider_id")?,
      resource_type: row.try_get("resource_type")?,
      provider: row.try_get("provider")?,
      properties: serde_json::from_str(&properties)?,
      inputs: serde_json::from_str(&inputs)?,
      outputs: serde_json::from_str(&outputs)?,
      dependencies: serde_json::from_str(&dependencies)?,
      protect: row.try_get("protect")?,
      updated_at,
    };
    Ok((id.parse()?, record))
  }
}

#[async_trait]
impl StateStore for SqliteStateStore {
  async fn load(&self) -> Result<PriorState, StateError> {
    let rows = sqlx::query(
      r#"
            SELECT resource_id, provider_id, resource_type, provider, properties,
                   inputs, outputs, dependencies, protect, updated_at
            FROM resource_state
            "#,
    )
    .fetch_all(&self.pool)
    .await?;

    let state = rows
      .iter()
      .map(Self::decode)
      .collect::<Result<PriorState, _>>()?;
    debug!(records = state.len(), "state loaded");
    Ok(state)
  }

  async fn commit(&self, id: &ResourceId, record: &StateRecord) -> Result<(), StateError> {
    sqlx::query(
      r#"
            INSERT INTO resource_state (resource_id, provider_id, resource_type, provider,
                                        properties, inputs, outputs, dependencies, protect,
                                        updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(resource_id) DO UPDATE SET
                provider_id = excluded.provider_id,
                resource_type = excluded.resource_type,
                provider = excluded.provider,
                properties = excluded.properties,
                inputs = excluded.inputs,
                outputs = excluded.outputs,
                dependencies = excluded.dependencies,
                protect = excluded.protect,
                updated_at = excluded.updated_at
            "#,
    )
    .bind(id.to_string())
    .bind(&record.provider_id)
    .bind(&record.resource_type)
    .bind(&record.provider)
    .bind(serde_json::to_string(&record.properties)?)
    .bind(serde_json::to_string(&record.inputs)?)
    .bind(serde_json::to_string(&record.outputs)?)
    .bind(serde_json::to_string(&record.dependencies)?)
    .bind(record.protect)
    .bind(record.updated_at)
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  async fn remove(&self, id: &ResourceId) -> Result<(), StateError> {
    sqlx::query(
      r#"
            DELETE FROM resource_state
            WHERE resource_id = ?
            "#,
    )
    .bind(id.to_string())
    .execute(&self.pool)
    .await?;

    Ok(())
  }
}
