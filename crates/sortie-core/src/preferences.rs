use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Where the poller gets its bearer token from.
///
/// Read on every tick, so a logout elsewhere in the app is picked up on the
/// next poll without restarting anything.
pub trait CredentialProvider: Send + Sync {
    fn auth_token(&self) -> Option<String>;
}

/// What actually lands on disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    auth_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
}

/// Session storage backed by a small JSON file
#[derive(Debug)]
pub struct PreferencesStore {
    path: PathBuf,
    prefs: RwLock<Preferences>,
}

impl PreferencesStore {
    /// Open the store at `path`; a missing file means "logged out"
    pub fn open(path: impl Into<PathBuf>) -> crate::Result<Self> {
        let path = path.into();
        let prefs = Self::read(&path)?;
        Ok(Self {
            path,
            prefs: RwLock::new(prefs),
        })
    }

    /// Open the store in the platform data directory
    pub fn open_default() -> crate::Result<Self> {
        Self::open(Self::default_path()?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn user_id(&self) -> Option<String> {
        self.prefs.read().user_id.clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.auth_token().is_some()
    }

    /// Remember a freshly issued session
    pub fn set_session(&self, token: &str, user_id: Option<&str>) -> crate::Result<()> {
        let mut prefs = self.prefs.write();
        prefs.auth_token = Some(token.to_string());
        prefs.user_id = user_id.map(str::to_string);
        self.write(&prefs)
    }

    /// Forget the session
    pub fn clear(&self) -> crate::Result<()> {
        let mut prefs = self.prefs.write();
        *prefs = Preferences::default();
        self.write(&prefs)
    }

    /// Re-read the file, e.g. after another process logged in
    pub fn reload(&self) -> crate::Result<()> {
        let fresh = Self::read(&self.path)?;
        *self.prefs.write() = fresh;
        Ok(())
    }

    fn read(path: &Path) -> crate::Result<Preferences> {
        if !path.exists() {
            return Ok(Preferences::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn write(&self, prefs: &Preferences) -> crate::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(prefs)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }

    /// Uses XDG data dir on Linux, AppData on Windows
    fn default_path() -> crate::Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| crate::Error::ConfigError("Could not find data directory".into()))?
            .join("sortie");

        Ok(data_dir.join("preferences.json"))
    }
}

impl CredentialProvider for PreferencesStore {
    /// Re-reads the file first so a login or logout from another process
    /// counts. If the file can't be read, the last known session is used.
    fn auth_token(&self) -> Option<String> {
        if let Err(e) = self.reload() {
            warn!("Could not re-read {}: {}", self.path.display(), e);
        }

        self.prefs
            .read()
            .auth_token
            .as_ref()
            .filter(|t| !t.trim().is_empty())
            .cloned()
    }
}
