mod common;
mod entity;

pub use common::common_routes;
pub use entity::{entity_routes, BODY_LIMIT_BYTES};
