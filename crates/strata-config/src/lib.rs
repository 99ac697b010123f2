//! Strata Config
//!
//! This crate contains the serializable declaration types for Strata.
//! These types describe a stack before it is loaded into a resource graph
//! by the engine.
//!
//! Declarations can come from:
//! - JSON files (a [`StackDef`] document)
//! - The builder API in `strata-graph`, which uses the same [`Value`] type
//!
//! Provider-specific defaults (image ids, network ranges, account ids) are
//! never part of the engine. They live in a [`StackConfig`] and are pulled
//! into property bags with [`Value::Config`].

mod enums;
mod resource;
mod stack;
mod value;

pub use enums::RetryBackoff;
pub use resource::{ResourceDef, ResourceId, ResourceIdError, ResourceOptions};
pub use stack::{ConfigError, StackConfig, StackDef};
pub use value::{ConfigRef, OutputRef, PropertyMap, Value};
