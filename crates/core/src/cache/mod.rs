//! Versioned cache stores of request → response snapshot.
//!
//! This module provides the store registry the caching layer runs against:
//!
//! - [`StoreRegistry`]: open-or-create, list and delete named stores
//! - [`CacheStore`]: lookup and overwrite snapshots within one store
//! - [`CacheDb`]: SQLite backend with async access via tokio-rusqlite
//!
//! Entries are never deleted individually; a store goes away as a whole when
//! activation prunes a superseded version.

pub mod connection;
pub mod hash;
pub mod migrations;
pub mod stores;

use std::sync::Arc;

pub use crate::Error;
use crate::{RequestDescriptor, ResponseSnapshot};

pub use connection::CacheDb;
pub use stores::SqliteStore;

/// Registry of named cache stores.
///
/// Opening is idempotent: concurrent opens of one name converge on the same
/// underlying store.
#[async_trait::async_trait]
pub trait StoreRegistry: Send + Sync {
    /// Open the named store, creating it if it does not exist.
    async fn open(&self, name: &str) -> Result<Arc<dyn CacheStore>, Error>;

    /// Names of every store currently known.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Delete a store and all of its entries. Returns whether it existed.
    async fn delete(&self, name: &str) -> Result<bool, Error>;
}

/// Handle to one open store.
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    fn name(&self) -> &str;

    /// Find the snapshot stored for `request`. A miss is `Ok(None)`, never an error.
    async fn lookup(&self, request: &RequestDescriptor) -> Result<Option<ResponseSnapshot>, Error>;

    /// Store `snapshot` for `request`, overwriting any previous entry.
    async fn put(&self, request: &RequestDescriptor, snapshot: &ResponseSnapshot) -> Result<(), Error>;

    /// Store a batch of entries. Backends that support it write the batch
    /// atomically; the default writes one entry at a time.
    async fn put_all(&self, entries: &[(RequestDescriptor, ResponseSnapshot)]) -> Result<(), Error> {
        for (request, snapshot) in entries {
            self.put(request, snapshot).await?;
        }
        Ok(())
    }
}
