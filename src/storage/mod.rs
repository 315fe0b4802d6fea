use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::UserProfile;

const SESSION_FILE: &str = "session.json";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("HOME environment variable not set")]
    NoHome,

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt session file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Token and user profile, always written and cleared together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub token: String,
    pub user: UserProfile,
}

/// Durable client credentials.
///
/// The session store is the only writer; the gateway only reads the token.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<PersistedSession>, StorageError>;

    fn save(&self, session: &PersistedSession) -> Result<(), StorageError>;

    fn clear(&self) -> Result<(), StorageError>;

    /// Bearer token, if one is persisted. Unreadable storage counts as absent.
    fn token(&self) -> Option<String> {
        match self.load() {
            Ok(session) => session.map(|s| s.token),
            Err(e) => {
                tracing::warn!("Ignoring unreadable credentials: {}", e);
                None
            }
        }
    }
}

/// JSON file under the client config directory
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(SESSION_FILE),
        }
    }

    /// Store in the default config directory, honouring `RAPIDO_CONFIG_DIR`
    pub fn in_config_dir(custom: Option<&Path>) -> Result<Self, StorageError> {
        let dir = match custom {
            Some(dir) => dir.to_path_buf(),
            None => default_config_dir()?,
        };
        Ok(Self::new(dir))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub fn default_config_dir() -> Result<PathBuf, StorageError> {
    if let Ok(custom_dir) = std::env::var("RAPIDO_CONFIG_DIR") {
        return Ok(PathBuf::from(custom_dir));
    }
    let home = std::env::var("HOME").map_err(|_| StorageError::NoHome)?;
    Ok(PathBuf::from(home).join(".config").join("rapido"))
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<PersistedSession>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;
        let session: PersistedSession = serde_json::from_str(&content)?;
        Ok(Some(session))
    }

    fn save(&self, session: &PersistedSession) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }

        // Write-then-rename so a reader never sees a token without its user
        let content = serde_json::to_string_pretty(session)?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, content)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    session: Mutex<Option<PersistedSession>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: PersistedSession) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<PersistedSession>, StorageError> {
        Ok(self.session.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, session: &PersistedSession) -> Result<(), StorageError> {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
