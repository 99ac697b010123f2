use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strata_config::ResourceId;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::{PriorState, StateError, StateRecord, StateStore};

const EXTENSION: &str = "json";
const TMP_EXTENSION: &str = "json.tmp";

#[derive(Serialize, Deserialize)]
struct Document {
  id: ResourceId,
  #[serde(flatten)]
  record: StateRecord,
}

/// Filesystem-based state store.
///
/// Each record is a JSON document at `{base_path}/{encoded id}.json`. A commit
/// writes a temporary file, syncs it, and renames it over the target, so a
/// reader sees either the old record or the new one.
pub struct FsStateStore {
  base_path: PathBuf,
}

impl FsStateStore {
  /// Create a new filesystem store with the given base path.
  pub fn new(base_path: impl Into<PathBuf>) -> Self {
    Self {
      base_path: base_path.into(),
    }
  }

  pub fn base_path(&self) -> &Path {
    &self.base_path
  }

  fn id_to_path(&self, id: &ResourceId, extension: &str) -> PathBuf {
    self
      .base_path
      .join(format!("{}.{}", encode_file_name(&id.to_string()), extension))
  }
}

/// A rename is only durable once the directory entry pointing at it is.
#[cfg(unix)]
async fn sync_dir(path: &Path) -> std::io::Result<()> {
  File::open(path).await?.sync_all().await
}

#[cfg(not(unix))]
async fn sync_dir(_path: &Path) -> std::io::Result<()> {
  Ok(())
}

/// Keep `[A-Za-z0-9._-]`, escape everything else as `%XX`.
fn encode_file_name(raw: &str) -> String {
  let mut encoded = String::with_capacity(raw.len());
  for byte in raw.bytes() {
    match byte {
      b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'_' | b'-' => encoded.push(byte as char),
      other => encoded.push_str(&format!("%{other:02X}")),
    }
  }
  encoded
}

#[async_trait]
impl StateStore for FsStateStore {
  async fn load(&self) -> Result<PriorState, StateError> {
    let mut state = PriorState::new();

    let mut entries = match fs::read_dir(&self.base_path).await {
      Ok(entries) => entries,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(state),
      Err(e) => return Err(e.into()),
    };

    while let Some(entry) = entries.next_entry().await? {
      let path = entry.path();
      if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
        if path.to_string_lossy().ends_with(TMP_EXTENSION) {
          warn!(path = %path.display(), "ignoring interrupted state write");
        }
        continue;
      }
      let content = fs::read(&path).await?;
      let document: Document = serde_json::from_slice(&content)?;
      state.insert(document.id, document.record);
    }

    debug!(records = state.len(), path = %self.base_path.display(), "state loaded");
    Ok(state)
  }

  async fn commit(&self, id: &ResourceId, record: &StateRecord) -> Result<(), StateError> {
    fs::create_dir_all(&self.base_path).await?;

    let document = Document {
      id: id.clone(),
      record: record.clone(),
    };
    let content = serde_json::to_vec_pretty(&document)?;

    let tmp_path = self.id_to_path(id, TMP_EXTENSION);
    let mut file = File::create(&tmp_path).await?;
    file.write_all(&content).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(&tmp_path, self.id_to_path(id, EXTENSION)).await?;
    sync_dir(&self.base_path).await?;
    Ok(())
  }

  async fn remove(&self, id: &ResourceId) -> Result<(), StateError> {
    match fs::remove_file(self.id_to_path(id, EXTENSION)).await {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(e.into()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_encode_file_name() {
    assert_eq!(encode_file_name("aws:s3/Bucket::site"), "aws%3As3%2FBucket%3A%3Asite");
    assert_eq!(encode_file_name("plain-name_1.x"), "plain-name_1.x");
  }
}
