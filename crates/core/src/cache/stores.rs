//! SQLite-backed store registry and store handles.
//!
//! A store is a row in `stores`; its snapshots live in `entries` and are
//! removed by cascade when the store is deleted.

use std::sync::Arc;

use bytes::Bytes;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::hash::descriptor_key;
use super::{CacheStore, StoreRegistry};
use crate::{Error, RequestDescriptor, ResponseSnapshot};

/// Handle to one store in a [`CacheDb`].
#[derive(Clone, Debug)]
pub struct SqliteStore {
    db: CacheDb,
    id: i64,
    name: String,
}

impl SqliteStore {
    pub fn id(&self) -> i64 {
        self.id
    }
}

impl CacheDb {
    /// Open (or create) a store and return the concrete handle.
    pub async fn open_store(&self, name: &str) -> Result<SqliteStore, Error> {
        let owned = name.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        let id = self
            .conn
            .call(move |conn| -> Result<i64, Error> {
                conn.execute(
                    "INSERT INTO stores (name, created_at) VALUES (?1, ?2)
                     ON CONFLICT(name) DO NOTHING",
                    params![owned, created_at],
                )?;
                let id = conn.query_row("SELECT id FROM stores WHERE name = ?1", params![owned], |row| row.get(0))?;
                Ok(id)
            })
            .await
            .map_err(Error::from)?;

        Ok(SqliteStore { db: self.clone(), id, name: name.to_string() })
    }

    /// Number of entries held by the named store; zero if it does not exist.
    pub async fn entry_count(&self, name: &str) -> Result<u64, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM entries e JOIN stores s ON s.id = e.store_id WHERE s.name = ?1",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// URLs stored in the named store, sorted.
    pub async fn entry_urls(&self, name: &str) -> Result<Vec<String>, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT e.url FROM entries e JOIN stores s ON s.id = e.store_id
                     WHERE s.name = ?1 ORDER BY e.url",
                )?;
                let urls = stmt
                    .query_map(params![name], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait::async_trait]
impl StoreRegistry for CacheDb {
    async fn open(&self, name: &str) -> Result<Arc<dyn CacheStore>, Error> {
        Ok(Arc::new(self.open_store(name).await?))
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM stores ORDER BY id")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM stores WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait::async_trait]
impl CacheStore for SqliteStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn lookup(&self, request: &RequestDescriptor) -> Result<Option<ResponseSnapshot>, Error> {
        let store_id = self.id;
        let key = descriptor_key(request);
        self.db
            .conn
            .call(move |conn| -> Result<Option<ResponseSnapshot>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT response_url, status, status_text, headers_json, body, stored_at
                     FROM entries WHERE store_id = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![store_id, key], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, u16>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Vec<u8>>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                });

                match result {
                    Ok((url, status, status_text, headers_json, body, stored_at)) => {
                        let headers: Vec<(String, String)> =
                            serde_json::from_str(&headers_json).map_err(|e| Error::CorruptEntry(e.to_string()))?;
                        Ok(Some(ResponseSnapshot {
                            url,
                            status,
                            status_text,
                            headers,
                            body: Bytes::from(body),
                            stored_at: Some(stored_at),
                        }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn put(&self, request: &RequestDescriptor, snapshot: &ResponseSnapshot) -> Result<(), Error> {
        self.write(vec![EntryRow::new(request, snapshot)?]).await
    }

    async fn put_all(&self, entries: &[(RequestDescriptor, ResponseSnapshot)]) -> Result<(), Error> {
        let rows = entries
            .iter()
            .map(|(request, snapshot)| EntryRow::new(request, snapshot))
            .collect::<Result<Vec<_>, _>>()?;
        self.write(rows).await
    }
}

const UPSERT_ENTRY: &str = "INSERT INTO entries (
        store_id, key_hash, method, url, response_url, status,
        status_text, headers_json, body, stored_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
    ON CONFLICT(store_id, key_hash) DO UPDATE SET
        method = excluded.method,
        url = excluded.url,
        response_url = excluded.response_url,
        status = excluded.status,
        status_text = excluded.status_text,
        headers_json = excluded.headers_json,
        body = excluded.body,
        stored_at = excluded.stored_at";

/// Column values for one entry, owned so they can cross to the connection thread.
struct EntryRow {
    key: String,
    method: String,
    url: String,
    response_url: String,
    status: u16,
    status_text: String,
    headers_json: String,
    body: Vec<u8>,
}

impl EntryRow {
    fn new(request: &RequestDescriptor, snapshot: &ResponseSnapshot) -> Result<Self, Error> {
        Ok(Self {
            key: descriptor_key(request),
            method: request.method().to_string(),
            url: request.url().to_string(),
            response_url: snapshot.url.clone(),
            status: snapshot.status,
            status_text: snapshot.status_text.clone(),
            headers_json: serde_json::to_string(&snapshot.headers).map_err(|e| Error::CorruptEntry(e.to_string()))?,
            body: snapshot.body.to_vec(),
        })
    }
}

impl SqliteStore {
    /// Upsert `rows` in one transaction: either all land or none do.
    async fn write(&self, rows: Vec<EntryRow>) -> Result<(), Error> {
        let store_id = self.id;
        let stored_at = chrono::Utc::now().to_rfc3339();

        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                {
                    let mut stmt = tx.prepare(UPSERT_ENTRY)?;
                    for row in &rows {
                        stmt.execute(params![
                            store_id,
                            row.key,
                            row.method,
                            row.url,
                            row.response_url,
                            row.status,
                            row.status_text,
                            row.headers_json,
                            row.body,
                            stored_at
                        ])?;
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn request(url: &str) -> RequestDescriptor {
        RequestDescriptor::get(Url::parse(url).unwrap())
    }

    fn snapshot(url: &str, body: &'static str) -> ResponseSnapshot {
        ResponseSnapshot {
            url: url.to_string(),
            status: 200,
            status_text: "OK".into(),
            headers: vec![
                ("content-type".into(), "application/javascript".into()),
                ("x-build".into(), "42".into()),
                ("set-cookie".into(), "a=1".into()),
                ("set-cookie".into(), "b=2".into()),
            ],
            body: Bytes::from_static(body.as_bytes()),
            stored_at: None,
        }
    }

    #[tokio::test]
    async fn test_put_then_lookup_round_trip() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open("shellcache-shell-v1").await.unwrap();
        let req = request("https://app.example/app.js");
        let stored = snapshot("https://app.example/app.js", "console.log(1)");

        store.put(&req, &stored).await.unwrap();

        let found = store.lookup(&req).await.unwrap().unwrap();
        assert!(found.stored_at.is_some());
        assert_eq!(found.without_metadata(), stored);
    }

    #[tokio::test]
    async fn test_lookup_miss_is_none() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open("shellcache-shell-v1").await.unwrap();
        let found = store.lookup(&request("https://app.example/missing.js")).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites_existing_entry() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open("shellcache-runtime-v1").await.unwrap();
        let req = request("https://cdn.example/lib.js");

        store.put(&req, &snapshot("https://cdn.example/lib.js", "old")).await.unwrap();
        store.put(&req, &snapshot("https://cdn.example/lib.js", "new")).await.unwrap();

        let found = store.lookup(&req).await.unwrap().unwrap();
        assert_eq!(found.text(), "new");
        assert_eq!(db.entry_count("shellcache-runtime-v1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_stores_are_isolated() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let shell = db.open("shellcache-shell-v1").await.unwrap();
        let runtime = db.open("shellcache-runtime-v1").await.unwrap();
        let req = request("https://app.example/");

        shell.put(&req, &snapshot("https://app.example/", "shell")).await.unwrap();

        assert!(runtime.lookup(&req).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_opens_converge() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let db = db.clone();
                tokio::spawn(async move { db.open_store("shellcache-font-v1").await })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap().id());
        }

        assert!(ids.iter().all(|id| *id == ids[0]));
        assert_eq!(db.keys().await.unwrap(), vec!["shellcache-font-v1"]);
    }

    #[tokio::test]
    async fn test_delete_removes_store_and_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open("shellcache-shell-v1").await.unwrap();
        store
            .put(&request("https://app.example/"), &snapshot("https://app.example/", "x"))
            .await
            .unwrap();

        assert!(db.delete("shellcache-shell-v1").await.unwrap());
        assert!(!db.delete("shellcache-shell-v1").await.unwrap());
        assert!(db.keys().await.unwrap().is_empty());
        assert_eq!(db.entry_count("shellcache-shell-v1").await.unwrap(), 0);

        let reopened = db.open("shellcache-shell-v1").await.unwrap();
        assert!(reopened.lookup(&request("https://app.example/")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_into_deleted_store_fails() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open("shellcache-shell-v1").await.unwrap();
        db.delete("shellcache-shell-v1").await.unwrap();

        let result = store
            .put(&request("https://app.example/"), &snapshot("https://app.example/", "x"))
            .await;
        assert!(matches!(result, Err(Error::Database(_))));
    }

    #[tokio::test]
    async fn test_put_all_is_all_or_nothing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open("shellcache-shell-v1").await.unwrap();
        db.conn
            .call(|conn| {
                conn.execute_batch(
                    "CREATE TRIGGER reject_sw BEFORE INSERT ON entries WHEN NEW.url LIKE '%/sw.js'
                     BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
                )
            })
            .await
            .unwrap();

        let entries: Vec<_> = ["https://app.example/", "https://app.example/index.html", "https://app.example/sw.js"]
            .into_iter()
            .map(|url| (request(url), snapshot(url, "x")))
            .collect();

        assert!(store.put_all(&entries).await.is_err());
        assert_eq!(db.entry_count("shellcache-shell-v1").await.unwrap(), 0);

        assert!(store.put_all(&entries[..2]).await.is_ok());
        assert_eq!(db.entry_count("shellcache-shell-v1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_entry_urls_sorted() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open("shellcache-shell-v1").await.unwrap();
        for path in ["/manifest.json", "/", "/index.html"] {
            let url = format!("https://app.example{path}");
            store.put(&request(&url), &snapshot(&url, "x")).await.unwrap();
        }

        let urls = db.entry_urls("shellcache-shell-v1").await.unwrap();
        assert_eq!(
            urls,
            vec!["https://app.example/", "https://app.example/index.html", "https://app.example/manifest.json"]
        );
    }
}
