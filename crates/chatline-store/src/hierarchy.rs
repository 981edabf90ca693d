//! Lazy, memoizing cache of cluster/bucket/scope/collection handles
//!
//! Each level is created on first access after resolving its parent, and
//! stays cached until invalidated. Invalidation cascades downward, so a child
//! handle is never cached while its parent is absent. All four handles and
//! the level names share a single async mutex.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::driver::{Bucket, Cluster, Collection, Connector, Scope};
use crate::error::{Error, Result};

/// Default bucket holding conversations
pub const DEFAULT_BUCKET: &str = "conversations";

/// Default scope and collection name
pub const DEFAULT_SCOPE: &str = "_default";

/// Default collection name
pub const DEFAULT_COLLECTION: &str = "_default";

/// Default bound on bucket readiness
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(5);

/// Names and limits for the hierarchy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub bucket: String,
    pub scope: String,
    pub collection: String,
    pub ready_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            ready_timeout: DEFAULT_READY_TIMEOUT,
        }
    }
}

struct Handles {
    bucket_name: String,
    scope_name: String,
    collection_name: String,
    cluster: Option<Arc<dyn Cluster>>,
    bucket: Option<Arc<dyn Bucket>>,
    scope: Option<Arc<dyn Scope>>,
    collection: Option<Arc<dyn Collection>>,
}

impl Handles {
    fn clear_collection(&mut self) -> bool {
        self.collection.take().is_some()
    }

    fn clear_scope(&mut self) -> bool {
        let below = self.clear_collection();
        self.scope.take().is_some() || below
    }

    fn clear_bucket(&mut self) -> bool {
        let below = self.clear_scope();
        self.bucket.take().is_some() || below
    }
}

/// The store handle hierarchy
pub struct StoreHandles {
    connector: Arc<dyn Connector>,
    ready_timeout: Duration,
    handles: Mutex<Handles>,
}

impl StoreHandles {
    pub fn new(connector: Arc<dyn Connector>, config: StoreConfig) -> Self {
        Self {
            connector,
            ready_timeout: config.ready_timeout,
            handles: Mutex::new(Handles {
                bucket_name: config.bucket,
                scope_name: config.scope,
                collection_name: config.collection,
                cluster: None,
                bucket: None,
                scope: None,
                collection: None,
            }),
        }
    }

    /// Cluster connection, connecting on first use
    pub async fn cluster(&self) -> Result<Arc<dyn Cluster>> {
        let mut handles = self.handles.lock().await;
        self.resolve_cluster(&mut handles).await
    }

    /// Ready bucket handle, waiting for readiness on first use
    pub async fn bucket(&self) -> Result<Arc<dyn Bucket>> {
        let mut handles = self.handles.lock().await;
        self.resolve_bucket(&mut handles).await
    }

    pub async fn scope(&self) -> Result<Arc<dyn Scope>> {
        let mut handles = self.handles.lock().await;
        self.resolve_scope(&mut handles).await
    }

    pub async fn collection(&self) -> Result<Arc<dyn Collection>> {
        let mut handles = self.handles.lock().await;
        self.resolve_collection(&mut handles).await
    }

    async fn resolve_cluster(&self, handles: &mut Handles) -> Result<Arc<dyn Cluster>> {
        if let Some(cluster) = &handles.cluster {
            return Ok(cluster.clone());
        }
        let cluster = self
            .connector
            .connect()
            .await
            .map_err(|e| Error::StoreUnavailable(format!("connect failed: {e}")))?;
        debug!("connected to cluster");
        handles.cluster = Some(cluster.clone());
        Ok(cluster)
    }

    async fn resolve_bucket(&self, handles: &mut Handles) -> Result<Arc<dyn Bucket>> {
        if let Some(bucket) = &handles.bucket {
            return Ok(bucket.clone());
        }
        let cluster = self.resolve_cluster(handles).await?;
        let bucket = cluster.bucket(&handles.bucket_name);
        match tokio::time::timeout(self.ready_timeout, bucket.wait_until_ready()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(Error::StoreUnavailable(format!(
                    "bucket {} not ready: {e}",
                    handles.bucket_name
                )));
            }
            Err(_) => {
                return Err(Error::StoreUnavailable(format!(
                    "bucket {} not ready after {:?}",
                    handles.bucket_name, self.ready_timeout
                )));
            }
        }
        debug!(bucket = %handles.bucket_name, "opened bucket");
        handles.bucket = Some(bucket.clone());
        Ok(bucket)
    }

    async fn resolve_scope(&self, handles: &mut Handles) -> Result<Arc<dyn Scope>> {
        if let Some(scope) = &handles.scope {
            return Ok(scope.clone());
        }
        let bucket = self.resolve_bucket(handles).await?;
        let scope = bucket.scope(&handles.scope_name);
        debug!(scope = %handles.scope_name, "opened scope");
        handles.scope = Some(scope.clone());
        Ok(scope)
    }

    async fn resolve_collection(&self, handles: &mut Handles) -> Result<Arc<dyn Collection>> {
        if let Some(collection) = &handles.collection {
            return Ok(collection.clone());
        }
        let scope = self.resolve_scope(handles).await?;
        let collection = scope.collection(&handles.collection_name);
        debug!(collection = %handles.collection_name, "opened collection");
        handles.collection = Some(collection.clone());
        Ok(collection)
    }

    /// Drop the collection handle
    pub async fn invalidate_collection(&self) -> bool {
        let cleared = self.handles.lock().await.clear_collection();
        debug!(cleared, "invalidated collection");
        cleared
    }

    /// Drop the scope and collection handles
    pub async fn invalidate_scope(&self) -> bool {
        let cleared = self.handles.lock().await.clear_scope();
        debug!(cleared, "invalidated scope");
        cleared
    }

    /// Drop the bucket, scope and collection handles
    pub async fn invalidate_bucket(&self) -> bool {
        let cleared = self.handles.lock().await.clear_bucket();
        debug!(cleared, "invalidated bucket");
        cleared
    }

    /// Close the cluster connection and drop every handle.
    ///
    /// When closing fails nothing is cleared, so the call can be retried.
    pub async fn invalidate_cluster(&self) -> Result<bool> {
        let mut handles = self.handles.lock().await;
        let Some(cluster) = handles.cluster.clone() else {
            return Ok(handles.clear_bucket());
        };
        if let Err(e) = cluster.close().await {
            warn!(error = %e, "failed to close cluster connection");
            return Err(Error::CloseFailed(e));
        }
        handles.clear_bucket();
        handles.cluster = None;
        debug!("invalidated cluster");
        Ok(true)
    }

    /// Switch to another bucket. Returns false when the name is unchanged.
    pub async fn change_bucket(&self, name: &str) -> bool {
        let mut handles = self.handles.lock().await;
        if handles.bucket_name == name {
            return false;
        }
        handles.clear_bucket();
        handles.bucket_name = name.to_string();
        debug!(bucket = name, "changed bucket");
        true
    }

    /// Switch to another scope. Returns false when the name is unchanged.
    pub async fn change_scope(&self, name: &str) -> bool {
        let mut handles = self.handles.lock().await;
        if handles.scope_name == name {
            return false;
        }
        handles.clear_scope();
        handles.scope_name = name.to_string();
        debug!(scope = name, "changed scope");
        true
    }

    /// Switch to another collection. Returns false when the name is unchanged.
    pub async fn change_collection(&self, name: &str) -> bool {
        let mut handles = self.handles.lock().await;
        if handles.collection_name == name {
            return false;
        }
        handles.clear_collection();
        handles.collection_name = name.to_string();
        debug!(collection = name, "changed collection");
        true
    }

    /// Every document id in the current collection, in store order
    pub async fn list_document_ids(&self) -> Result<Vec<String>> {
        let collection = self.collection().await?;
        let mut cursor = collection.query_ids().await.map_err(Error::QueryFailed)?;

        let mut ids = Vec::new();
        while let Some(next) = cursor.next().await {
            match next {
                Ok(id) => ids.push(id),
                Err(e) => {
                    if let Err(close_err) = cursor.close().await {
                        warn!(error = %close_err, "failed to close cursor after query error");
                    }
                    return Err(Error::QueryFailed(e));
                }
            }
        }
        cursor.close().await.map_err(Error::QueryFailed)?;

        debug!(count = ids.len(), "listed document ids");
        Ok(ids)
    }

    /// Fetch one document from the current collection
    pub async fn get_document(&self, id: &str) -> Result<Value> {
        let collection = self.collection().await?;
        collection
            .get(id)
            .await
            .map_err(Error::ReadFailed)?
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Insert or replace one document in the current collection
    pub async fn upsert_document(&self, id: &str, document: Value) -> Result<()> {
        let collection = self.collection().await?;
        collection
            .upsert(id, document)
            .await
            .map_err(Error::PersistFailed)?;
        info!(id, "stored document");
        Ok(())
    }

    /// Remove one document from the current collection
    pub async fn remove_document(&self, id: &str) -> Result<()> {
        let collection = self.collection().await?;
        let existed = collection.remove(id).await.map_err(Error::PersistFailed)?;
        if !existed {
            return Err(Error::NotFound(id.to_string()));
        }
        info!(id, "removed document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::MemoryStore;
    use serde_json::json;

    fn config() -> StoreConfig {
        StoreConfig {
            ready_timeout: Duration::from_millis(50),
            ..StoreConfig::default()
        }
    }

    fn handles(store: &MemoryStore) -> StoreHandles {
        StoreHandles::new(Arc::new(store.clone()), config())
    }

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.bucket, "conversations");
        assert_eq!(config.scope, "_default");
        assert_eq!(config.collection, "_default");
        assert_eq!(config.ready_timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_levels_memoize() {
        let store = MemoryStore::new();
        let handles = handles(&store);

        handles.collection().await.unwrap();
        handles.collection().await.unwrap();
        handles.bucket().await.unwrap();

        let stats = store.stats();
        assert_eq!(stats.connects, 1);
        assert_eq!(stats.buckets, 1);
        assert_eq!(stats.scopes, 1);
        assert_eq!(stats.collections, 1);
    }

    #[tokio::test]
    async fn test_invalidate_collection_then_rebuild() {
        let store = MemoryStore::new();
        let handles = handles(&store);

        handles.collection().await.unwrap();
        assert!(handles.invalidate_collection().await);
        assert!(!handles.invalidate_collection().await);
        handles.collection().await.unwrap();

        let stats = store.stats();
        assert_eq!(stats.collections, 2);
        assert_eq!(stats.scopes, 1);
    }

    #[tokio::test]
    async fn test_invalidate_scope_keeps_bucket() {
        let store = MemoryStore::new();
        let handles = handles(&store);

        handles.collection().await.unwrap();
        assert!(handles.invalidate_scope().await);
        handles.collection().await.unwrap();

        let stats = store.stats();
        assert_eq!(stats.buckets, 1);
        assert_eq!(stats.scopes, 2);
        assert_eq!(stats.collections, 2);
    }

    #[tokio::test]
    async fn test_invalidate_bucket_keeps_cluster() {
        let store = MemoryStore::new();
        let handles = handles(&store);

        handles.collection().await.unwrap();
        assert!(handles.invalidate_bucket().await);
        handles.collection().await.unwrap();

        let stats = store.stats();
        assert_eq!(stats.connects, 1);
        assert_eq!(stats.closes, 0);
        assert_eq!(stats.buckets, 2);
        assert_eq!(stats.scopes, 2);
        assert_eq!(stats.collections, 2);
    }

    #[tokio::test]
    async fn test_invalidate_on_empty_hierarchy() {
        let store = MemoryStore::new();
        let handles = handles(&store);

        assert!(!handles.invalidate_collection().await);
        assert!(!handles.invalidate_scope().await);
        assert!(!handles.invalidate_bucket().await);
        assert!(!handles.invalidate_cluster().await.unwrap());
        assert_eq!(store.stats().closes, 0);
    }

    #[tokio::test]
    async fn test_invalidate_cluster_closes_and_clears() {
        let store = MemoryStore::new();
        let handles = handles(&store);

        handles.collection().await.unwrap();
        assert!(handles.invalidate_cluster().await.unwrap());
        assert_eq!(store.stats().closes, 1);

        handles.collection().await.unwrap();
        let stats = store.stats();
        assert_eq!(stats.connects, 2);
        assert_eq!(stats.buckets, 2);
        assert_eq!(stats.collections, 2);
    }

    #[tokio::test]
    async fn test_failed_close_keeps_cluster() {
        let store = MemoryStore::new();
        let handles = handles(&store);

        handles.collection().await.unwrap();
        store.set_fail_close(true);
        let err = handles.invalidate_cluster().await.unwrap_err();
        assert!(matches!(err, Error::CloseFailed(_)));

        // Nothing was cleared, so no level is rebuilt
        handles.collection().await.unwrap();
        let stats = store.stats();
        assert_eq!(stats.connects, 1);
        assert_eq!(stats.collections, 1);

        store.set_fail_close(false);
        assert!(handles.invalidate_cluster().await.unwrap());
    }

    #[tokio::test]
    async fn test_bucket_readiness_timeout() {
        let store = MemoryStore::new();
        store.set_never_ready(true);
        let handles = handles(&store);

        let err = handles.collection().await.err().unwrap();
        assert!(matches!(err, Error::StoreUnavailable(_)));
        // The cluster connection survives a readiness failure
        assert_eq!(store.stats().connects, 1);

        store.set_never_ready(false);
        handles.collection().await.unwrap();
        assert_eq!(store.stats().connects, 1);
    }

    #[tokio::test]
    async fn test_connect_failure() {
        let store = MemoryStore::new();
        store.set_fail_connect(true);
        let handles = handles(&store);

        let err = handles.cluster().await.err().unwrap();
        assert!(matches!(err, Error::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn test_change_bucket() {
        let store = MemoryStore::new();
        let handles = handles(&store);

        handles.collection().await.unwrap();
        assert!(!handles.change_bucket("conversations").await);
        handles.collection().await.unwrap();
        assert_eq!(store.stats().buckets, 1);

        assert!(handles.change_bucket("archive").await);
        handles.collection().await.unwrap();
        let stats = store.stats();
        assert_eq!(stats.connects, 1);
        assert_eq!(stats.buckets, 2);
        assert_eq!(stats.scopes, 2);
        assert_eq!(stats.collections, 2);
    }

    #[tokio::test]
    async fn test_change_collection_targets_new_documents() {
        let store = MemoryStore::new();
        let handles = handles(&store);

        handles.upsert_document("a", json!({"n": 1})).await.unwrap();
        assert!(handles.change_collection("other").await);
        assert!(handles.list_document_ids().await.unwrap().is_empty());
        assert!(!handles.change_collection("other").await);

        assert!(handles.change_collection("_default").await);
        assert_eq!(handles.list_document_ids().await.unwrap(), vec!["a"]);
        assert_eq!(store.stats().scopes, 1);
    }

    #[tokio::test]
    async fn test_change_scope() {
        let store = MemoryStore::new();
        let handles = handles(&store);

        handles.collection().await.unwrap();
        assert!(handles.change_scope("drafts").await);
        handles.collection().await.unwrap();
        let stats = store.stats();
        assert_eq!(stats.buckets, 1);
        assert_eq!(stats.scopes, 2);
    }

    #[tokio::test]
    async fn test_list_document_ids() {
        let store = MemoryStore::new();
        let handles = handles(&store);

        for id in ["b", "a", "c"] {
            handles.upsert_document(id, json!({ "id": id })).await.unwrap();
        }
        let ids = handles.list_document_ids().await.unwrap();
        assert_eq!(ids, vec!["a", "b", "c"]);

        let stats = store.stats();
        assert_eq!(stats.cursors_opened, 1);
        assert_eq!(stats.cursors_closed, 1);
    }

    #[tokio::test]
    async fn test_list_empty_collection() {
        let store = MemoryStore::new();
        let handles = handles(&store);
        assert!(handles.list_document_ids().await.unwrap().is_empty());
        assert_eq!(store.stats().cursors_closed, 1);
    }

    #[tokio::test]
    async fn test_query_failure_closes_cursor() {
        let store = MemoryStore::new();
        let handles = handles(&store);

        handles.upsert_document("a", json!({})).await.unwrap();
        handles.upsert_document("b", json!({})).await.unwrap();
        store.set_fail_query(true);

        let err = handles.list_document_ids().await.unwrap_err();
        assert!(matches!(err, Error::QueryFailed(_)));
        assert_eq!(store.stats().cursors_closed, 1);
    }

    #[tokio::test]
    async fn test_cursor_close_failure_is_query_failure() {
        let store = MemoryStore::new();
        let handles = handles(&store);

        handles.upsert_document("a", json!({})).await.unwrap();
        store.set_fail_cursor_close(true);

        let err = handles.list_document_ids().await.unwrap_err();
        assert!(matches!(err, Error::QueryFailed(_)));
    }

    #[tokio::test]
    async fn test_document_operations() {
        let store = MemoryStore::new();
        let handles = handles(&store);

        let err = handles.get_document("missing").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(ref id) if id == "missing"));

        handles
            .upsert_document("doc", json!({"name": "first"}))
            .await
            .unwrap();
        handles
            .upsert_document("doc", json!({"name": "second"}))
            .await
            .unwrap();
        let doc = handles.get_document("doc").await.unwrap();
        assert_eq!(doc["name"], "second");

        handles.remove_document("doc").await.unwrap();
        let err = handles.remove_document("doc").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_write_failure_is_persist_failure() {
        let store = MemoryStore::new();
        let handles = handles(&store);
        store.set_fail_writes(true);

        let err = handles.upsert_document("doc", json!({})).await.unwrap_err();
        assert!(matches!(err, Error::PersistFailed(_)));
        let err = handles.remove_document("doc").await.unwrap_err();
        assert!(matches!(err, Error::PersistFailed(_)));
    }
}
