//! Cache-related MCP tools.
//!
//! Read-only views of the store registry.

pub mod get;
pub mod list;

pub use get::{CacheGetParams, get_impl};
pub use list::list_impl;
