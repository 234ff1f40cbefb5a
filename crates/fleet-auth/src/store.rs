//! Token store abstraction and backend selection
//!
//! The client holds an `Arc<dyn TokenStore>` and never knows which backend
//! sits behind it. The backend is chosen once from configuration:
//! - `file` (primary): JSON file on disk, survives restarts
//! - `memory` (fallback): process-local, gone on exit
//!
//! There is no silent degradation from one to the other. If the file store
//! cannot be opened, `open_store` returns the error.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::file_store::FileTokenStore;
use crate::tokens::TokenPair;

/// Boxed future returned by `TokenStore` methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Persistent slot holding at most one `TokenPair`.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn TokenStore>`). Writes are last-write-wins; `save` replaces the
/// whole pair in one step.
pub trait TokenStore: Send + Sync {
    /// Backend name for logging and diagnostics (e.g. "file", "memory")
    fn backend(&self) -> &'static str;

    /// Current pair, or None when logged out.
    fn load(&self) -> StoreFuture<'_, Option<TokenPair>>;

    /// Replace the stored pair.
    fn save(&self, pair: TokenPair) -> StoreFuture<'_, ()>;

    /// Remove both tokens. Clearing an empty store succeeds.
    fn clear(&self) -> StoreFuture<'_, ()>;
}

/// Which `TokenStore` implementation to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    File,
    Memory,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::File => "file",
            StoreBackend::Memory => "memory",
        }
    }
}

impl FromStr for StoreBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "file" => Ok(StoreBackend::File),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(Error::UnknownBackend(other.to_owned())),
        }
    }
}

/// Build the configured token store.
///
/// `path` is only used by the file backend.
pub async fn open_store(backend: StoreBackend, path: &Path) -> Result<Arc<dyn TokenStore>> {
    let store: Arc<dyn TokenStore> = match backend {
        StoreBackend::File => Arc::new(FileTokenStore::open(path.to_path_buf()).await?),
        StoreBackend::Memory => Arc::new(MemoryTokenStore::new()),
    };
    info!(backend = store.backend(), "token store ready");
    Ok(store)
}

/// In-process token store.
#[derive(Default)]
pub struct MemoryTokenStore {
    slot: RwLock<Option<TokenPair>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a pair already stored.
    pub fn with_tokens(pair: TokenPair) -> Self {
        Self {
            slot: RwLock::new(Some(pair)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn load(&self) -> StoreFuture<'_, Option<TokenPair>> {
        Box::pin(async move { Ok(self.slot.read().await.clone()) })
    }

    fn save(&self, pair: TokenPair) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            *self.slot.write().await = Some(pair);
            debug!("stored token pair in memory");
            Ok(())
        })
    }

    fn clear(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            *self.slot.write().await = None;
            Ok(())
        })
    }
}
