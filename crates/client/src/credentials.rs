//! Durable single-owner store for the bearer credential.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tokio::sync::watch;

/// On-disk shape: one token under one well-known key. Nothing else is
/// persisted client-side.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialFile {
    access_token: Option<String>,
}

/// Holder of the current bearer token.
///
/// The token survives client restarts in a mode-0600 file; `set(None)`
/// removes the persisted state. All other components reach credentials only
/// through the session manager or the gateway, never through the file.
///
/// A mutation is visible to the very next `get`, and presence transitions
/// are published on a watch channel so dependents observe a forced logout
/// triggered by the gateway's 401 handling.
pub struct CredentialStore {
    path: PathBuf,
    token: RwLock<Option<String>>,
    presence: watch::Sender<bool>,
}

impl CredentialStore {
    /// Open the store, loading any previously persisted token.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let token = load_token(&path);
        let (presence, _) = watch::channel(token.is_some());
        Self {
            path,
            token: RwLock::new(token),
            presence,
        }
    }

    /// The current token, if any.
    pub fn get(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Replace the credential. `None` clears both memory and disk.
    ///
    /// The in-memory value is updated before touching disk, so invalidation
    /// is visible to the next issued request even if persistence fails.
    pub fn set(&self, token: Option<String>) {
        let token = token.filter(|t| !t.trim().is_empty());
        let present = token.is_some();
        {
            let mut guard = self.token.write().unwrap_or_else(|e| e.into_inner());
            *guard = token.clone();
        }
        if let Err(err) = persist(&self.path, token.as_deref()) {
            tracing::warn!(path = %self.path.display(), error = %err, "failed to persist credential");
        }
        self.presence.send_replace(present);
    }

    /// Watch credential presence. Receives `true` while a token is held.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.presence.subscribe()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn load_token(path: &Path) -> Option<String> {
    let contents = std::fs::read_to_string(path).ok()?;
    let file: CredentialFile = match toml::from_str(&contents) {
        Ok(file) => file,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "ignoring unreadable credential file");
            return None;
        }
    };
    file.access_token.filter(|t| !t.trim().is_empty())
}

fn persist(path: &Path, token: Option<&str>) -> std::io::Result<()> {
    let Some(token) = token else {
        match std::fs::remove_file(path) {
            Ok(()) => return Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err),
        }
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let contents = toml::to_string_pretty(&CredentialFile {
        access_token: Some(token.to_string()),
    })
    .map_err(std::io::Error::other)?;
    std::fs::write(path, contents)?;

    // Restrictive permissions: the file contains the bearer token.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}
