//! File-backed token store
//!
//! Keeps the token pair in a single JSON document so both tokens are always
//! written together. Writes go through a temp file + rename so a crash never
//! leaves a half-written pair behind. A tokio Mutex guards the in-memory
//! mirror and serializes concurrent writes from parallel refreshes.
//!
//! The file is read once at open time. Later reads come from the mirror.

use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::store::{StoreFuture, TokenStore};
use crate::tokens::TokenPair;

/// Token store persisted as `{"access_token": ..., "refresh_token": ...}`.
pub struct FileTokenStore {
    path: PathBuf,
    state: Mutex<Option<TokenPair>>,
}

impl FileTokenStore {
    /// Open the store at `path`.
    ///
    /// A missing file means "logged out"; it is created on the first save.
    /// A file that exists but does not parse is an error rather than being
    /// treated as empty.
    pub async fn open(path: PathBuf) -> Result<Self> {
        let state = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => {
                let pair: TokenPair = serde_json::from_str(&contents)
                    .map_err(|e| Error::Parse(format!("parsing {}: {e}", path.display())))?;
                info!(path = %path.display(), "loaded stored tokens");
                Some(pair)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "token file not found, starting logged out");
                None
            }
            Err(e) => {
                return Err(Error::Io(format!("reading {}: {e}", path.display())));
            }
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn backend(&self) -> &'static str {
        "file"
    }

    fn load(&self) -> StoreFuture<'_, Option<TokenPair>> {
        Box::pin(async move { Ok(self.state.lock().await.clone()) })
    }

    fn save(&self, pair: TokenPair) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            write_atomic(&self.path, &pair).await?;
            *state = Some(pair);
            Ok(())
        })
    }

    fn clear(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            match tokio::fs::remove_file(&self.path).await {
                Ok(()) => debug!(path = %self.path.display(), "removed token file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(Error::Io(format!(
                        "removing {}: {e}",
                        self.path.display()
                    )));
                }
            }
            *state = None;
            Ok(())
        })
    }
}

/// Write the pair to `path` atomically with 0600 permissions.
///
/// Creates the parent directory if needed.
async fn write_atomic(path: &Path, pair: &TokenPair) -> Result<()> {
    let json = serde_json::to_string_pretty(pair)
        .map_err(|e| Error::Parse(format!("serializing tokens: {e}")))?;

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| Error::Io(format!("creating {}: {e}", dir.display())))?;

    let tmp_path = dir.join(format!(".tokens.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp token file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting token file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp token file: {e}")))?;

    debug!(path = %path.display(), "persisted tokens");
    Ok(())
}
