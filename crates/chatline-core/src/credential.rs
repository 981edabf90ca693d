//! API key loading, validation and caching

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use parking_lot::Mutex;
use regex::Regex;
use tracing::debug;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use crate::error::{Error, Result};

static KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^sk-[a-zA-Z0-9]{48}$").unwrap());

/// A validated API key
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Trim trailing newlines and validate the key format
    pub fn parse(raw: &str) -> Result<Self> {
        let key = raw.trim_end_matches(['\n', '\r']);
        if KEY_PATTERN.is_match(key) {
            Ok(Self(key.to_string()))
        } else {
            Err(Error::Invalid(
                "expected \"sk-\" followed by 48 letters or digits".to_string(),
            ))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Keep the secret out of logs
impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(sk-***)")
    }
}

/// Where the raw key is persisted
pub trait KeyStore: Send + Sync {
    /// Raw persisted key, `None` when nothing is stored
    fn read(&self) -> io::Result<Option<String>>;

    /// Persist a key verbatim
    fn write(&self, raw: &str) -> io::Result<()>;
}

/// Key stored in a single file with owner-only permissions
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    path: PathBuf,
}

impl FileKeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyStore for FileKeyStore {
    fn read(&self) -> io::Result<Option<String>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&self, raw: &str) -> io::Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
                #[cfg(unix)]
                fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
            }
        }

        fs::write(&self.path, raw)?;

        // Owner read/write only
        #[cfg(unix)]
        fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;

        Ok(())
    }
}

/// Lazily loaded API key
pub struct CredentialCache {
    store: Box<dyn KeyStore>,
    key: Mutex<Option<ApiKey>>,
}

impl CredentialCache {
    pub fn new(store: impl KeyStore + 'static) -> Self {
        Self {
            store: Box::new(store),
            key: Mutex::new(None),
        }
    }

    /// Cached key, reading and validating the persisted one on first use
    pub fn get(&self) -> Result<ApiKey> {
        let mut slot = self.key.lock();
        if let Some(key) = slot.as_ref() {
            return Ok(key.clone());
        }

        let raw = self
            .store
            .read()?
            .ok_or_else(|| Error::NotFound("API key".to_string()))?;
        let key = ApiKey::parse(&raw)?;
        debug!("loaded API key");
        *slot = Some(key.clone());
        Ok(key)
    }

    /// Forget the cached key. Returns whether one was cached.
    pub fn invalidate(&self) -> bool {
        let cleared = self.key.lock().take().is_some();
        debug!(cleared, "invalidated API key");
        cleared
    }

    /// Persist a key verbatim; the cache is left untouched
    pub fn create(&self, raw: &str) -> Result<()> {
        self.store.write(raw)?;
        debug!("stored API key");
        Ok(())
    }
}
