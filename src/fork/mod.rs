//! Fork references and the operations built on them.

mod duplicate;
mod materializer;
mod metadata;
mod reference;
mod resolver;
mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use duplicate::{dataset_fork, resource_fork, ForkRequest};
pub use materializer::{materialize_for_create, materialize_for_update, metadata_changed};
pub use metadata::{fork_metadata, ForkMetadata};
pub use reference::ForkReference;
pub use resolver::{resolve, resolve_reference, ResolvedSnapshot};
pub use sync::is_synced;
