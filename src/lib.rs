//! Entity core: declared entity types persisted in memory, with unique
//! constraints, lazy cursors, and per-field visibility policies.

pub mod config;
pub mod error;
pub mod handlers;
pub mod policy;
pub mod query;
pub mod response;
pub mod routes;
pub mod schema;
pub mod service;
pub mod state;
pub mod store;

pub use config::{load_from_dir, resolve, FullConfig, ResolvedModel};
pub use error::{AppError, ConfigError};
pub use policy::{OutwardRecord, PolicySet, ViewerContext};
pub use query::{Cursor, Filter};
pub use response::{success_many, success_one};
pub use routes::{common_routes, entity_routes};
pub use schema::{EntitySchema, FieldSpec, FieldType, Persistable, PolicyLabel, SchemaRegistry};
pub use service::{EntityCursor, EntityService};
pub use state::AppState;
pub use store::{EntityId, Fields, Record, Store};
