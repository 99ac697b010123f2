//! Strata
//!
//! A declarative infrastructure orchestration engine. Resources, their
//! dependencies and exported outputs are declared as a graph; the engine
//! plans the difference against recorded state and applies it through
//! provider plugins.
//!
//! This crate re-exports the public API of the workspace crates:
//! - [`config`]: declaration types and stack configuration
//! - [`graph`]: graph builder, topological ordering, value resolution
//! - [`provider`]: the provider plugin interface
//! - [`state`]: state records and stores
//! - [`plan`]: the planner
//! - [`executor`]: plan execution
//! - [`engine`]: preview, up, refresh and destroy runs

pub use strata_config as config;
pub use strata_engine as engine;
pub use strata_executor as executor;
pub use strata_graph as graph;
pub use strata_plan as plan;
pub use strata_provider as provider;
pub use strata_state as state;

pub use strata_config::{ResourceId, StackConfig, StackDef, Value};
pub use strata_engine::{Engine, EngineConfig, EngineError, RunReport, load_stack};
pub use strata_executor::RunStatus;
pub use strata_graph::{Graph, GraphBuilder, ResourceNode};
pub use strata_provider::{Provider, ProviderError, ProviderRegistry};
pub use strata_state::StateStore;
pub use tokio_util::sync::CancellationToken;
