//! EntityService: validated, policy-enforcing CRUD over the in-memory store.

mod facade;
mod validation;
pub use facade::{EntityCursor, EntityService};
pub use validation::RequestValidator;
