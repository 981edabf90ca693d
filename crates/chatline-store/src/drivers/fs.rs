//! Filesystem driver: one JSON file per document.
//!
//! Layout is `<root>/<bucket>/<scope>/<collection>/<id>.json`. Writes go to a
//! temporary sibling first and are renamed into place.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::driver::{Bucket, Cluster, Collection, Connector, IdCursor, Scope};
use crate::error::{DriverError, DriverResult};

const EXTENSION: &str = "json";

/// Connects to a directory tree rooted at `root`
#[derive(Debug, Clone)]
pub struct FsConnector {
    root: PathBuf,
}

impl FsConnector {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl Connector for FsConnector {
    async fn connect(&self) -> DriverResult<Arc<dyn Cluster>> {
        tokio::fs::create_dir_all(&self.root).await?;
        tracing::debug!(root = %self.root.display(), "opened document root");
        Ok(Arc::new(FsCluster {
            root: self.root.clone(),
        }))
    }
}

struct FsCluster {
    root: PathBuf,
}

#[async_trait]
impl Cluster for FsCluster {
    fn bucket(&self, name: &str) -> Arc<dyn Bucket> {
        Arc::new(FsBucket {
            path: self.root.join(name),
        })
    }

    async fn close(&self) -> DriverResult<()> {
        Ok(())
    }
}

struct FsBucket {
    path: PathBuf,
}

#[async_trait]
impl Bucket for FsBucket {
    async fn wait_until_ready(&self) -> DriverResult<()> {
        tokio::fs::create_dir_all(&self.path).await?;
        let metadata = tokio::fs::metadata(&self.path).await?;
        if !metadata.is_dir() {
            return Err(DriverError::Other(format!(
                "{} is not a directory",
                self.path.display()
            )));
        }
        Ok(())
    }

    fn scope(&self, name: &str) -> Arc<dyn Scope> {
        Arc::new(FsScope {
            path: self.path.join(name),
        })
    }
}

struct FsScope {
    path: PathBuf,
}

impl Scope for FsScope {
    fn collection(&self, name: &str) -> Arc<dyn Collection> {
        Arc::new(FsCollection {
            dir: self.path.join(name),
        })
    }
}

struct FsCollection {
    dir: PathBuf,
}

impl FsCollection {
    fn document_path(&self, id: &str) -> DriverResult<PathBuf> {
        if id.is_empty() || id.starts_with('.') || id.contains(['/', '\\']) {
            return Err(DriverError::Other(format!("invalid document id: {id:?}")));
        }
        Ok(self.dir.join(format!("{id}.{EXTENSION}")))
    }
}

#[async_trait]
impl Collection for FsCollection {
    async fn get(&self, id: &str) -> DriverResult<Option<Value>> {
        let path = self.document_path(id)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn upsert(&self, id: &str, document: Value) -> DriverResult<()> {
        let path = self.document_path(id)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let bytes = serde_json::to_vec_pretty(&document)?;
        let tmp = path.with_extension(format!("{EXTENSION}.tmp"));
        tokio::fs::write(&tmp, &bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn remove(&self, id: &str) -> DriverResult<bool> {
        let path = self.document_path(id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn query_ids(&self) -> DriverResult<Box<dyn IdCursor>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Box::new(FsCursor::default()));
            }
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        // Directory order is unspecified; present ids sorted
        ids.sort();

        Ok(Box::new(FsCursor { ids: ids.into() }))
    }
}

#[derive(Default)]
struct FsCursor {
    ids: VecDeque<String>,
}

#[async_trait]
impl IdCursor for FsCursor {
    async fn next(&mut self) -> Option<DriverResult<String>> {
        self.ids.pop_front().map(Ok)
    }

    async fn close(&mut self) -> DriverResult<()> {
        self.ids.clear();
        Ok(())
    }
}
