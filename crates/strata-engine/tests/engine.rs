//! Integration tests for Engine runs against in-process providers.

use std::sync::Arc;

use serde_json::json;
use strata_config::{ResourceId, StackConfig, StackDef, Value};
use strata_engine::{Engine, EngineConfig, EngineError, load_stack};
use strata_executor::RunStatus;
use strata_graph::{GraphBuilder, GraphError, ResourceNode};
use strata_plan::{Operation, PlanError};
use strata_provider::{MemoryProvider, ProviderRegistry};
use strata_state::{FsStateStore, MemoryStateStore, StateStore};
use tokio_util::sync::CancellationToken;

const STATIC_SITE: &str = r#"{
  "name": "static-site",
  "resources": [
    {
      "name": "index",
      "type": "aws:s3/BucketObject",
      "properties": {
        "bucket": { "reference": { "resource": "aws:s3/Bucket::site", "output": "id" } },
        "key": { "literal": "index.html" },
        "content_type": { "literal": "text/html" },
        "source": { "concat": [
          { "config": { "key": "site_dir", "default": "www" } },
          { "literal": "/index.html" }
        ] }
      }
    },
    {
      "name": "site",
      "type": "aws:s3/Bucket",
      "properties": {
        "acl": { "config": { "key": "acl" } },
        "website": { "literal": { "index_document": "index.html" } }
      }
    }
  ],
  "outputs": {
    "bucket_name": { "reference": { "resource": "aws:s3/Bucket::site", "output": "id" } },
    "url": { "concat": [
      { "literal": "http://" },
      { "reference": { "resource": "aws:s3/Bucket::site", "output": "id" } },
      { "literal": ".s3-website.local" }
    ] }
  }
}"#;

fn stack_config() -> StackConfig {
  let mut config = StackConfig::new();
  config.set("acl", "public-read");
  config
}

fn site_id() -> ResourceId {
  ResourceId::new("aws:s3/Bucket", "site")
}

fn index_id() -> ResourceId {
  ResourceId::new("aws:s3/BucketObject", "index")
}

fn engine(state: Arc<dyn StateStore>) -> (Engine, Arc<MemoryProvider>) {
  let aws = Arc::new(MemoryProvider::new());
  let providers = ProviderRegistry::new().with("aws", aws.clone());
  (Engine::new(providers, state, EngineConfig::default()), aws)
}

#[tokio::test]
async fn test_up_creates_stack_and_resolves_outputs() {
  let state = Arc::new(MemoryStateStore::new());
  let (engine, aws) = engine(state.clone());
  let graph = load_stack(StackDef::from_json_str(STATIC_SITE).unwrap(), stack_config()).unwrap();

  let preview = engine.preview(graph.clone()).await.unwrap();
  assert_eq!(
    preview
      .plan
      .operations()
      .into_iter()
      .map(|(id, op)| (id.clone(), op))
      .collect::<Vec<_>>(),
    vec![(site_id(), Operation::Create), (index_id(), Operation::Create)]
  );
  assert!(aws.is_empty());

  let report = engine.up(graph.clone(), CancellationToken::new()).await.unwrap();

  assert_eq!(report.status(), RunStatus::Succeeded);
  assert_eq!(report.summary.create, 2);
  let bucket_id = report.outputs["bucket_name"].as_str().unwrap().to_string();
  assert_eq!(
    report.outputs["url"],
    json!(format!("http://{bucket_id}.s3-website.local"))
  );
  assert!(report.unresolved_outputs.is_empty());

  let prior = state.load().await.unwrap();
  assert_eq!(prior.len(), 2);
  let index = prior.get(&index_id()).unwrap();
  assert_eq!(index.inputs["bucket"], json!(bucket_id));
  assert_eq!(index.inputs["source"], json!("www/index.html"));
  assert_eq!(prior.get(&site_id()).unwrap().inputs["acl"], json!("public-read"));

  // A second run changes nothing.
  let again = engine.up(graph, CancellationToken::new()).await.unwrap();
  assert_eq!(again.status(), RunStatus::Succeeded);
  assert_eq!(again.summary.no_op, 2);
  assert_eq!(again.outputs, report.outputs);
  assert_eq!(aws.len(), 2);
}

#[tokio::test]
async fn test_destroy_deletes_dependents_first() {
  let state = Arc::new(MemoryStateStore::new());
  let (engine, aws) = engine(state.clone());
  let graph = load_stack(StackDef::from_json_str(STATIC_SITE).unwrap(), stack_config()).unwrap();
  engine.up(graph, CancellationToken::new()).await.unwrap();

  let report = engine.destroy(CancellationToken::new()).await.unwrap();

  assert_eq!(report.status(), RunStatus::Succeeded);
  let order: Vec<_> = report
    .apply
    .entries
    .iter()
    .map(|e| (e.id.clone(), e.operation))
    .collect();
  assert_eq!(
    order,
    vec![(index_id(), Operation::Delete), (site_id(), Operation::Delete)]
  );
  assert!(state.load().await.unwrap().is_empty());
  assert!(aws.is_empty());
}

#[tokio::test]
async fn test_missing_required_config_aborts_before_planning() {
  let err = load_stack(
    StackDef::from_json_str(STATIC_SITE).unwrap(),
    StackConfig::new(),
  )
  .unwrap_err();

  assert!(matches!(
    err,
    EngineError::Graph(GraphError::MissingConfig { ref key, .. }) if key == "acl"
  ));
}

#[tokio::test]
async fn test_unknown_provider_aborts_run() {
  let state = Arc::new(MemoryStateStore::new());
  let (engine, aws) = engine(state.clone());
  let mut builder = GraphBuilder::new();
  builder
    .declare(ResourceNode::new("aws:s3/Bucket", "ok"))
    .unwrap();
  builder
    .declare(ResourceNode::new("gcp:storage/Bucket", "other"))
    .unwrap();
  let graph = builder.finalize().unwrap();

  let err = engine
    .up(graph, CancellationToken::new())
    .await
    .unwrap_err();

  assert!(matches!(err, EngineError::Plan(PlanError::UnknownProvider { .. })));
  assert!(aws.is_empty());
  assert!(state.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_outputs_of_skipped_resources_are_unresolved() {
  let state = Arc::new(MemoryStateStore::new());
  let (engine, _aws) = engine(state);

  let mut builder = GraphBuilder::new();
  let bucket = builder
    .declare(ResourceNode::new("aws:s3/Bucket", "site"))
    .unwrap();
  builder.export("bucket", bucket.output("id")).unwrap();
  builder
    .export("missing", bucket.output("no_such_output"))
    .unwrap();
  let graph = builder.finalize().unwrap();

  let dry = Engine::new(
    engine.providers().clone(),
    Arc::new(MemoryStateStore::new()),
    EngineConfig::default().dry_run(),
  );
  let report = dry.up(graph.clone(), CancellationToken::new()).await.unwrap();
  assert_eq!(
    report.unresolved_outputs,
    vec!["bucket".to_string(), "missing".to_string()]
  );

  let report = engine.up(graph, CancellationToken::new()).await.unwrap();
  assert!(report.outputs.contains_key("bucket"));
  assert_eq!(report.unresolved_outputs, vec!["missing".to_string()]);
}

#[tokio::test]
async fn test_state_persists_across_engines() {
  let dir = tempfile::tempdir().unwrap();
  let graph = load_stack(StackDef::from_json_str(STATIC_SITE).unwrap(), stack_config()).unwrap();

  let (first, _) = engine(Arc::new(FsStateStore::new(dir.path())));
  first.up(graph.clone(), CancellationToken::new()).await.unwrap();

  let (second, _) = engine(Arc::new(FsStateStore::new(dir.path())));
  let preview = second.preview(graph).await.unwrap();
  assert!(!preview.plan.has_changes());
}

#[tokio::test]
async fn test_refresh_drops_vanished_resources() {
  let state = Arc::new(MemoryStateStore::new());
  let (engine, aws) = engine(state.clone());
  let mut builder = GraphBuilder::new();
  builder
    .declare(ResourceNode::new("aws:s3/Bucket", "logs").property("acl", "private"))
    .unwrap();
  let graph = builder.finalize().unwrap();
  engine.up(graph.clone(), CancellationToken::new()).await.unwrap();

  let logs = ResourceId::new("aws:s3/Bucket", "logs");
  let provider_id = state.load().await.unwrap().get(&logs).unwrap().provider_id.clone();
  aws.forget(&provider_id);

  let refreshed = engine.refresh(CancellationToken::new()).await.unwrap();
  assert_eq!(refreshed.removed, vec![logs.clone()]);

  let preview = engine.preview(graph).await.unwrap();
  assert_eq!(preview.plan.get(&logs).unwrap().operation, Operation::Create);
}

#[tokio::test]
async fn test_explicit_depends_on_orders_independent_resources() {
  let state = Arc::new(MemoryStateStore::new());
  let (engine, _) = engine(state.clone());

  let mut builder = GraphBuilder::new();
  builder
    .declare(
      ResourceNode::new("aws:ec2/Instance", "web")
        .property("user_data", Value::from("#!/bin/bash"))
        .depends_on(ResourceId::new("aws:ec2/SecurityGroup", "web")),
    )
    .unwrap();
  builder
    .declare(ResourceNode::new("aws:ec2/SecurityGroup", "web"))
    .unwrap();
  let graph = builder.finalize().unwrap();

  let report = engine.up(graph, CancellationToken::new()).await.unwrap();

  assert_eq!(report.apply.entries[0].id.resource_type, "aws:ec2/SecurityGroup");
  let record = state
    .load()
    .await
    .unwrap()
    .get(&ResourceId::new("aws:ec2/Instance", "web"))
    .unwrap()
    .clone();
  assert_eq!(
    record.dependencies,
    vec![ResourceId::new("aws:ec2/SecurityGroup", "web")]
  );
}
