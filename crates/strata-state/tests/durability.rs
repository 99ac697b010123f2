use chrono::{TimeZone, Utc};
use serde_json::json;
use strata_config::{PropertyMap, ResourceId, Value};
use strata_state::{FsStateStore, JsonMap, SqliteStateStore, StateRecord, StateStore};

fn bucket_id() -> ResourceId {
  ResourceId::new("aws:s3/Bucket", "site")
}

fn object_id() -> ResourceId {
  ResourceId::new("aws:s3/BucketObject", "index")
}

fn object_record() -> StateRecord {
  let mut properties = PropertyMap::new();
  properties.insert("bucket".to_string(), Value::reference(bucket_id(), "id"));
  properties.insert("key".to_string(), Value::from("index.html"));

  let mut inputs = JsonMap::new();
  inputs.insert("bucket".to_string(), json!("bucket-0001"));
  inputs.insert("key".to_string(), json!("index.html"));

  let mut outputs = inputs.clone();
  outputs.insert("id".to_string(), json!("bucketobject-0002"));

  StateRecord {
    provider_id: "bucketobject-0002".to_string(),
    resource_type: "aws:s3/BucketObject".to_string(),
    provider: "aws".to_string(),
    properties,
    inputs,
    outputs,
    dependencies: vec![bucket_id()],
    protect: false,
    updated_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
  }
}

#[tokio::test]
async fn test_sqlite_commit_survives_reopen() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("state.db");
  let record = object_record();

  {
    let store = SqliteStateStore::connect(&path).await.unwrap();
    store.commit(&object_id(), &record).await.unwrap();
  }

  let reopened = SqliteStateStore::connect(&path).await.unwrap();
  let state = reopened.load().await.unwrap();
  assert_eq!(state.len(), 1);
  assert_eq!(state.get(&object_id()), Some(&record));
}

#[tokio::test]
async fn test_sqlite_commit_replaces_and_remove_deletes() {
  let store = SqliteStateStore::in_memory().await.unwrap();
  let mut record = object_record();

  store.commit(&object_id(), &record).await.unwrap();
  record.outputs.insert("etag".to_string(), json!("abc"));
  store.commit(&object_id(), &record).await.unwrap();

  let state = store.load().await.unwrap();
  assert_eq!(state.len(), 1);
  assert_eq!(state.get(&object_id()).unwrap().outputs["etag"], json!("abc"));

  store.remove(&object_id()).await.unwrap();
  store.remove(&object_id()).await.unwrap();
  assert!(store.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_fs_commit_survives_reopen() {
  let dir = tempfile::tempdir().unwrap();
  let record = object_record();

  FsStateStore::new(dir.path())
    .commit(&object_id(), &record)
    .await
    .unwrap();

  let state = FsStateStore::new(dir.path()).load().await.unwrap();
  assert_eq!(state.get(&object_id()), Some(&record));

  // No temporary files are left behind.
  let leftovers: Vec<_> = std::fs::read_dir(dir.path())
    .unwrap()
    .filter_map(Result::ok)
    .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
    .collect();
  assert!(leftovers.is_empty());
}

#[tokio::test]
async fn test_fs_commit_into_new_directory_overwrites_in_place() {
  let dir = tempfile::tempdir().unwrap();
  let base = dir.path().join("stacks").join("dev");
  let store = FsStateStore::new(&base);

  store.commit(&object_id(), &object_record()).await.unwrap();
  let mut moved = object_record();
  moved.inputs.insert("key".to_string(), json!("home.html"));
  store.commit(&object_id(), &moved).await.unwrap();

  let state = FsStateStore::new(&base).load().await.unwrap();
  assert_eq!(state.len(), 1);
  assert_eq!(state.get(&object_id()), Some(&moved));
  assert_eq!(std::fs::read_dir(&base).unwrap().count(), 1);
}

#[tokio::test]
async fn test_fs_load_missing_directory_is_empty() {
  let dir = tempfile::tempdir().unwrap();
  let store = FsStateStore::new(dir.path().join("not-created-yet"));

  assert!(store.load().await.unwrap().is_empty());
  store.remove(&bucket_id()).await.unwrap();
}

#[tokio::test]
async fn test_fs_remove_deletes_record() {
  let dir = tempfile::tempdir().unwrap();
  let store = FsStateStore::new(dir.path());

  store.commit(&object_id(), &object_record()).await.unwrap();
  store.remove(&object_id()).await.unwrap();

  assert!(store.load().await.unwrap().is_empty());
}
