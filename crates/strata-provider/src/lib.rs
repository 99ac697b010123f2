//! Strata Provider
//!
//! The provider plugin interface is the only boundary between the engine and
//! the systems it manages. A [`Provider`] implements create/read/update/delete
//! for a family of resource types. Providers are registered by tag in a
//! [`ProviderRegistry`]; each resource node names the tag that manages it.
//!
//! [`MemoryProvider`] is an in-process implementation used for previews and
//! tests.

mod error;
mod memory;
mod provider;
mod registry;

pub use error::ProviderError;
pub use memory::MemoryProvider;
pub use provider::{Created, Properties, Provider};
pub use registry::ProviderRegistry;
