//! Strata Engine
//!
//! This crate ties the graph, planner, executor and state store together
//! into runs.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Engine                             │
//! │  - preview(graph) → Preview                                 │
//! │  - up(graph, cancel) / destroy(cancel) → RunReport          │
//! │  - refresh(cancel) → RefreshResult                          │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Planner                             │
//! │  - plan(graph, prior state) → Plan                          │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Executor                            │
//! │  - apply(plan, cancel) → ApplyResult                        │
//! │  - provider calls, retries, incremental state commits       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let providers = ProviderRegistry::new().with("aws", Arc::new(aws_provider));
//! let state = Arc::new(SqliteStateStore::connect("state.db").await?);
//! let engine = Engine::new(providers, state, EngineConfig::default());
//!
//! let graph = load_stack(StackDef::from_file("stack.json")?, StackConfig::from_file("dev.json")?)?;
//! let report = engine.up(graph, CancellationToken::new()).await?;
//! println!("{}", report.outputs["url"]);
//! ```

mod config;
mod context;
mod engine;
mod error;
mod report;

pub use config::EngineConfig;
pub use context::{RunContext, load_stack};
pub use engine::Engine;
pub use error::EngineError;
pub use report::{Preview, RunReport};
