//! # Token storage
//!
//! Client-local key-value storage for the auth token pair (`access_token`,
//! `refresh_token`).
//!
//! The storage is shared process-wide as an `Arc<dyn TokenStore>`. Reading is
//! open to everyone; writing is reserved for the refresh protocol in
//! [`crate::client`] and the login/register/logout operations in
//! [`crate::api::auth`].
//!
//! Two backends are provided:
//!
//! - [`MemoryTokenStore`]: process-lifetime storage, used by tests and
//!   embedders that manage persistence themselves.
//! - [`FileTokenStore`]: a small JSON document (`tokens.json` by default)
//!   rewritten atomically through a temporary file on every change.
//!
//! ```no_run
//! use parts_scout::tokens::{FileTokenStore, TokenStore};
//!
//! let store = FileTokenStore::new("/tmp/tokens.json");
//! store.set_tokens("access", "refresh").unwrap();
//! assert_eq!(store.access_token().as_deref(), Some("access"));
//! ```

use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("could not write token file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not encode tokens: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Storage for the access/refresh token pair.
pub trait TokenStore: Send + Sync {
    fn access_token(&self) -> Option<String>;

    fn refresh_token(&self) -> Option<String>;

    /// Persist a freshly issued pair, replacing whatever was stored.
    fn set_tokens(&self, access_token: &str, refresh_token: &str) -> Result<(), TokenStoreError>;

    /// Forget the access token only; the refresh token stays.
    fn clear_access_token(&self) -> Result<(), TokenStoreError>;

    /// Forget both tokens.
    fn clear(&self) -> Result<(), TokenStoreError>;
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct StoredTokens {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
}

/// In-memory token storage.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<StoredTokens>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an already issued pair.
    pub fn with_tokens(access_token: &str, refresh_token: &str) -> Self {
        Self {
            tokens: Mutex::new(StoredTokens {
                access_token: Some(access_token.to_string()),
                refresh_token: Some(refresh_token.to_string()),
            }),
        }
    }

    fn update(&self, f: impl FnOnce(&mut StoredTokens)) {
        let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut tokens);
    }

    fn snapshot(&self) -> StoredTokens {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TokenStore for MemoryTokenStore {
    fn access_token(&self) -> Option<String> {
        self.snapshot().access_token
    }

    fn refresh_token(&self) -> Option<String> {
        self.snapshot().refresh_token
    }

    fn set_tokens(&self, access_token: &str, refresh_token: &str) -> Result<(), TokenStoreError> {
        self.update(|tokens| {
            tokens.access_token = Some(access_token.to_string());
            tokens.refresh_token = Some(refresh_token.to_string());
        });
        Ok(())
    }

    fn clear_access_token(&self) -> Result<(), TokenStoreError> {
        self.update(|tokens| tokens.access_token = None);
        Ok(())
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        self.update(|tokens| *tokens = StoredTokens::default());
        Ok(())
    }
}

/// Token storage backed by a JSON file.
///
/// The file is re-read on every access so several `pscout` invocations see
/// each other's logins. A missing or unreadable file reads as "no tokens".
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> StoredTokens {
        match fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|err| {
                warn!("Ignoring malformed token file {}: {}", self.path.display(), err);
                StoredTokens::default()
            }),
            Err(_) => StoredTokens::default(),
        }
    }

    fn write(&self, tokens: &StoredTokens) -> Result<(), TokenStoreError> {
        let write_err = |source| TokenStoreError::Write {
            path: self.path.clone(),
            source,
        };

        if tokens.access_token.is_none() && tokens.refresh_token.is_none() {
            return match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(err) => Err(write_err(err)),
            };
        }

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(write_err)?;

        let json = serde_json::to_vec_pretty(tokens)?;
        let mut temp = tempfile::NamedTempFile::new_in(&dir).map_err(write_err)?;
        temp.write_all(&json).map_err(write_err)?;
        temp.persist(&self.path)
            .map_err(|err| write_err(err.error))?;
        Ok(())
    }

    fn modify(&self, f: impl FnOnce(&mut StoredTokens)) -> Result<(), TokenStoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut tokens = self.read();
        f(&mut tokens);
        self.write(&tokens)
    }
}

impl TokenStore for FileTokenStore {
    fn access_token(&self) -> Option<String> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.read().access_token
    }

    fn refresh_token(&self) -> Option<String> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.read().refresh_token
    }

    fn set_tokens(&self, access_token: &str, refresh_token: &str) -> Result<(), TokenStoreError> {
        self.modify(|tokens| {
            tokens.access_token = Some(access_token.to_string());
            tokens.refresh_token = Some(refresh_token.to_string());
        })
    }

    fn clear_access_token(&self) -> Result<(), TokenStoreError> {
        self.modify(|tokens| tokens.access_token = None)
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        self.modify(|tokens| *tokens = StoredTokens::default())
    }
}
