//! Driver traits: the seam between the handle cache and a concrete store.
//!
//! The levels mirror a document database: a cluster connection hands out
//! buckets, a bucket hands out scopes, a scope hands out collections. Only
//! connecting, bucket readiness and document operations touch the store;
//! opening a scope or collection is a local handle construction.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::DriverResult;

/// Opens cluster connections
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect to the cluster
    async fn connect(&self) -> DriverResult<Arc<dyn Cluster>>;
}

/// An open cluster connection
#[async_trait]
pub trait Cluster: Send + Sync {
    /// Open a bucket handle (not yet ready)
    fn bucket(&self, name: &str) -> Arc<dyn Bucket>;

    /// Close the connection
    async fn close(&self) -> DriverResult<()>;
}

/// A bucket handle
#[async_trait]
pub trait Bucket: Send + Sync {
    /// Resolve once the bucket can serve requests
    async fn wait_until_ready(&self) -> DriverResult<()>;

    /// Open a scope handle
    fn scope(&self, name: &str) -> Arc<dyn Scope>;
}

/// A scope handle
pub trait Scope: Send + Sync {
    /// Open a collection handle
    fn collection(&self, name: &str) -> Arc<dyn Collection>;
}

/// A collection of JSON documents addressed by id
#[async_trait]
pub trait Collection: Send + Sync {
    /// Fetch a document, `None` when absent
    async fn get(&self, id: &str) -> DriverResult<Option<Value>>;

    /// Insert or replace a document
    async fn upsert(&self, id: &str, document: Value) -> DriverResult<()>;

    /// Remove a document, returning whether it existed
    async fn remove(&self, id: &str) -> DriverResult<bool>;

    /// Run a query over every document id in the collection
    async fn query_ids(&self) -> DriverResult<Box<dyn IdCursor>>;
}

/// Result cursor of an id query. Callers must `close` it.
#[async_trait]
pub trait IdCursor: Send {
    /// Next id, `None` once exhausted
    async fn next(&mut self) -> Option<DriverResult<String>>;

    /// Release the cursor
    async fn close(&mut self) -> DriverResult<()>;
}
