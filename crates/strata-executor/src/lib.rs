//! Strata Executor
//!
//! This crate applies a [`Plan`](strata_plan::Plan) through the registered
//! providers and records each result in a state store as soon as it
//! completes.
//!
//! - Entries start only once every dependency reached a terminal outcome
//! - Independent entries run concurrently, bounded by `max_concurrency`
//! - A failed entry skips its dependents; nothing is rolled back
//! - Transient provider errors are retried with backoff
//! - Cancellation stops scheduling and waits for in-flight entries

mod config;
mod error;
mod events;
mod executor;
mod refresh;
mod result;
mod retry;

pub use config::{ExecutorConfig, RetryPolicy};
pub use error::ExecutorError;
pub use events::{ApplyEvent, ApplyNotifier, ChannelNotifier, NoopNotifier};
pub use executor::Executor;
pub use refresh::RefreshResult;
pub use result::{ApplyResult, EntryOutcome, EntryResult, RunStatus, SkipReason};
