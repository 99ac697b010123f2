//! Strata Plan
//!
//! This crate diffs a finalized resource graph against prior state and
//! produces an ordered [`Plan`]:
//! - A node without a state record is created
//! - A node whose declared properties changed is updated, or replaced when a
//!   changed property cannot be modified in place
//! - A record whose node is no longer declared is deleted
//!
//! Creates and updates follow the graph's topological order. Deletes follow,
//! dependents before the resources they depended on.

mod error;
mod plan;
mod planner;

pub use error::PlanError;
pub use plan::{Operation, Plan, PlanEntry, PlanSummary};
pub use planner::Planner;
