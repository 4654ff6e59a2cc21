//! Core types and shared functionality for shellcache.
//!
//! This crate provides:
//! - Request descriptors and response snapshots
//! - Versioned cache store registry with SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod request;

pub use cache::{CacheDb, CacheStore, StoreRegistry};
pub use config::{AppConfig, ConfigError, StoreNames};
pub use error::Error;
pub use request::{RequestDescriptor, ResponseSnapshot};
