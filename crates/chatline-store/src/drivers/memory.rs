//! In-memory driver
//!
//! Documents live in process-local maps shared by every handle cloned from
//! one [`MemoryStore`]. Construction counters and fault switches make it the
//! test double for everything built on the hierarchy.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::driver::{Bucket, Cluster, Collection, Connector, IdCursor, Scope};
use crate::error::{DriverError, DriverResult};

type Partition = BTreeMap<String, Value>;

#[derive(Default)]
struct Counters {
    connects: AtomicUsize,
    closes: AtomicUsize,
    buckets: AtomicUsize,
    scopes: AtomicUsize,
    collections: AtomicUsize,
    cursors_opened: AtomicUsize,
    cursors_closed: AtomicUsize,
}

#[derive(Default)]
struct Faults {
    connect: AtomicBool,
    close: AtomicBool,
    never_ready: AtomicBool,
    query: AtomicBool,
    cursor_close: AtomicBool,
    writes: AtomicBool,
}

#[derive(Default)]
struct Shared {
    partitions: Mutex<HashMap<(String, String, String), Partition>>,
    counters: Counters,
    faults: Faults,
}

/// Snapshot of how many handles and cursors were created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub connects: usize,
    pub closes: usize,
    pub buckets: usize,
    pub scopes: usize,
    pub collections: usize,
    pub cursors_opened: usize,
    pub cursors_closed: usize,
}

/// Process-local document store; acts as its own [`Connector`]
#[derive(Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> MemoryStats {
        let c = &self.shared.counters;
        MemoryStats {
            connects: c.connects.load(Ordering::SeqCst),
            closes: c.closes.load(Ordering::SeqCst),
            buckets: c.buckets.load(Ordering::SeqCst),
            scopes: c.scopes.load(Ordering::SeqCst),
            collections: c.collections.load(Ordering::SeqCst),
            cursors_opened: c.cursors_opened.load(Ordering::SeqCst),
            cursors_closed: c.cursors_closed.load(Ordering::SeqCst),
        }
    }

    /// Make `connect` fail
    pub fn set_fail_connect(&self, fail: bool) {
        self.shared.faults.connect.store(fail, Ordering::SeqCst);
    }

    /// Make cluster `close` fail
    pub fn set_fail_close(&self, fail: bool) {
        self.shared.faults.close.store(fail, Ordering::SeqCst);
    }

    /// Make bucket readiness never resolve
    pub fn set_never_ready(&self, never: bool) {
        self.shared.faults.never_ready.store(never, Ordering::SeqCst);
    }

    /// Make id cursors fail after yielding their first id
    pub fn set_fail_query(&self, fail: bool) {
        self.shared.faults.query.store(fail, Ordering::SeqCst);
    }

    /// Make closing an id cursor fail
    pub fn set_fail_cursor_close(&self, fail: bool) {
        self.shared.faults.cursor_close.store(fail, Ordering::SeqCst);
    }

    /// Make upserts and removals fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.shared.faults.writes.store(fail, Ordering::SeqCst);
    }

    /// Raw document as stored, bypassing every handle
    pub fn document(&self, bucket: &str, scope: &str, collection: &str, id: &str) -> Option<Value> {
        let key = (bucket.to_string(), scope.to_string(), collection.to_string());
        self.shared
            .partitions
            .lock()
            .get(&key)
            .and_then(|p| p.get(id).cloned())
    }

    /// Store a raw document, bypassing every handle
    pub fn insert(&self, bucket: &str, scope: &str, collection: &str, id: &str, document: Value) {
        let key = (bucket.to_string(), scope.to_string(), collection.to_string());
        self.shared
            .partitions
            .lock()
            .entry(key)
            .or_default()
            .insert(id.to_string(), document);
    }
}

fn injected(what: &str) -> DriverError {
    DriverError::Other(format!("injected {what} failure"))
}

#[async_trait]
impl Connector for MemoryStore {
    async fn connect(&self) -> DriverResult<Arc<dyn Cluster>> {
        if self.shared.faults.connect.load(Ordering::SeqCst) {
            return Err(injected("connect"));
        }
        self.shared.counters.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MemoryCluster {
            shared: self.shared.clone(),
        }))
    }
}

struct MemoryCluster {
    shared: Arc<Shared>,
}

#[async_trait]
impl Cluster for MemoryCluster {
    fn bucket(&self, name: &str) -> Arc<dyn Bucket> {
        self.shared.counters.buckets.fetch_add(1, Ordering::SeqCst);
        Arc::new(MemoryBucket {
            shared: self.shared.clone(),
            name: name.to_string(),
        })
    }

    async fn close(&self) -> DriverResult<()> {
        if self.shared.faults.close.load(Ordering::SeqCst) {
            return Err(injected("close"));
        }
        self.shared.counters.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct MemoryBucket {
    shared: Arc<Shared>,
    name: String,
}

#[async_trait]
impl Bucket for MemoryBucket {
    async fn wait_until_ready(&self) -> DriverResult<()> {
        if self.shared.faults.never_ready.load(Ordering::SeqCst) {
            futures::future::pending::<()>().await;
        }
        Ok(())
    }

    fn scope(&self, name: &str) -> Arc<dyn Scope> {
        self.shared.counters.scopes.fetch_add(1, Ordering::SeqCst);
        Arc::new(MemoryScope {
            shared: self.shared.clone(),
            bucket: self.name.clone(),
            name: name.to_string(),
        })
    }
}

struct MemoryScope {
    shared: Arc<Shared>,
    bucket: String,
    name: String,
}

impl Scope for MemoryScope {
    fn collection(&self, name: &str) -> Arc<dyn Collection> {
        self.shared.counters.collections.fetch_add(1, Ordering::SeqCst);
        Arc::new(MemoryCollection {
            shared: self.shared.clone(),
            key: (self.bucket.clone(), self.name.clone(), name.to_string()),
        })
    }
}

struct MemoryCollection {
    shared: Arc<Shared>,
    key: (String, String, String),
}

impl MemoryCollection {
    fn check_writes(&self) -> DriverResult<()> {
        if self.shared.faults.writes.load(Ordering::SeqCst) {
            return Err(injected("write"));
        }
        Ok(())
    }
}

#[async_trait]
impl Collection for MemoryCollection {
    async fn get(&self, id: &str) -> DriverResult<Option<Value>> {
        Ok(self
            .shared
            .partitions
            .lock()
            .get(&self.key)
            .and_then(|p| p.get(id).cloned()))
    }

    async fn upsert(&self, id: &str, document: Value) -> DriverResult<()> {
        self.check_writes()?;
        self.shared
            .partitions
            .lock()
            .entry(self.key.clone())
            .or_default()
            .insert(id.to_string(), document);
        Ok(())
    }

    async fn remove(&self, id: &str) -> DriverResult<bool> {
        self.check_writes()?;
        Ok(self
            .shared
            .partitions
            .lock()
            .get_mut(&self.key)
            .is_some_and(|p| p.remove(id).is_some()))
    }

    async fn query_ids(&self) -> DriverResult<Box<dyn IdCursor>> {
        let ids: VecDeque<String> = self
            .shared
            .partitions
            .lock()
            .get(&self.key)
            .map(|p| p.keys().cloned().collect())
            .unwrap_or_default();
        self.shared
            .counters
            .cursors_opened
            .fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryCursor {
            shared: self.shared.clone(),
            ids,
            yielded: 0,
        }))
    }
}

struct MemoryCursor {
    shared: Arc<Shared>,
    ids: VecDeque<String>,
    yielded: usize,
}

#[async_trait]
impl IdCursor for MemoryCursor {
    async fn next(&mut self) -> Option<DriverResult<String>> {
        if self.yielded > 0 && self.shared.faults.query.load(Ordering::SeqCst) {
            return Some(Err(injected("query")));
        }
        let id = self.ids.pop_front()?;
        self.yielded += 1;
        Some(Ok(id))
    }

    async fn close(&mut self) -> DriverResult<()> {
        self.shared
            .counters
            .cursors_closed
            .fetch_add(1, Ordering::SeqCst);
        if self.shared.faults.cursor_close.load(Ordering::SeqCst) {
            return Err(injected("cursor close"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_partitions_are_isolated() {
        let store = MemoryStore::new();
        store.insert("b", "s", "one", "x", json!(1));

        let cluster = store.connect().await.unwrap();
        let bucket = cluster.bucket("b");
        let scope = bucket.scope("s");
        let one = scope.collection("one");
        let two = scope.collection("two");

        assert_eq!(one.get("x").await.unwrap(), Some(json!(1)));
        assert_eq!(two.get("x").await.unwrap(), None);

        two.upsert("y", json!(2)).await.unwrap();
        assert_eq!(store.document("b", "s", "two", "y"), Some(json!(2)));
        assert!(two.remove("y").await.unwrap());
        assert!(!two.remove("y").await.unwrap());
    }

    #[tokio::test]
    async fn test_cursor_yields_sorted_ids() {
        let store = MemoryStore::new();
        for id in ["c", "a", "b"] {
            store.insert("b", "s", "c", id, json!({}));
        }
        let cluster = store.connect().await.unwrap();
        let collection = cluster.bucket("b").scope("s").collection("c");

        let mut cursor = collection.query_ids().await.unwrap();
        let mut ids = Vec::new();
        while let Some(id) = cursor.next().await {
            ids.push(id.unwrap());
        }
        cursor.close().await.unwrap();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
