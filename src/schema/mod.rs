//! Schema registry: declared entity types and their per-field metadata.

mod registry;
mod types;

pub use registry::SchemaRegistry;
pub use types::*;
