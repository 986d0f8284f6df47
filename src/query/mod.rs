//! Cursor engine: filters and lazy traversals.

mod cursor;
mod filter;

pub use cursor::Cursor;
pub use filter::Filter;
