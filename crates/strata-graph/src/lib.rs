//! Strata Graph
//!
//! This crate provides the resource graph for Strata. A graph is the
//! validated form of a set of declarations:
//! - Every reference points at a declared resource
//! - Dependency edges are materialized from references and `depends_on`
//! - The graph is acyclic and stored in a stable topological order
//! - Configuration lookups are bound to literals
//!
//! References stay lazy. They are evaluated with [`resolve_value`] once the
//! outputs of the referenced resources are known.

mod builder;
mod error;
mod graph;
mod node;
mod resolve;

pub use builder::{GraphBuilder, NodeHandle};
pub use error::{GraphError, ResolveError};
pub use graph::Graph;
pub use node::ResourceNode;
pub use resolve::{OutputLookup, Outputs, lookup_path, resolve_properties, resolve_value};
