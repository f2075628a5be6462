//! Fork tracking for data catalog resources.
//!
//! A resource may point at another resource, optionally pinned to a
//! revision of the source's dataset. Creating or updating such a resource
//! copies the source's file metadata, and showing it reports whether the
//! copy still matches the source.

pub mod api;
pub mod chain;
pub mod config;
pub mod context;
pub mod error;
pub mod fork;
pub mod host;
pub mod model;
pub mod search;
pub mod util;
pub mod validators;

pub use chain::ActionRegistry;
pub use context::CallerContext;
pub use error::{ForkError, Result};
pub use fork::{ForkMetadata, ForkReference};
pub use host::{CatalogActions, MemoryCatalog};
