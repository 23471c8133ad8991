//! Calibration profile persistence.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::debug;

use crate::calibration::CalibrationProfile;
use crate::error::{Result, VoiceBridgeError};

/// Storage backend for calibration profiles, keyed per speaker.
///
/// A save replaces the stored profile wholesale; there are no partial
/// updates.
pub trait CalibrationStore: Send + Sync {
    /// Loads the profile stored under `key`, if any.
    fn load(&self, key: &str) -> Result<Option<CalibrationProfile>>;

    /// Stores `profile` under `key`, replacing any previous profile.
    fn save(&self, key: &str, profile: &CalibrationProfile) -> Result<()>;
}

/// In-memory store for tests and ephemeral sessions.
pub struct MemoryStore {
    profiles: Mutex<HashMap<String, CalibrationProfile>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            profiles: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CalibrationStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<CalibrationProfile>> {
        let profiles = self
            .profiles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(profiles.get(key).copied())
    }

    fn save(&self, key: &str, profile: &CalibrationProfile) -> Result<()> {
        let mut profiles = self
            .profiles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        profiles.insert(key.to_string(), *profile);
        Ok(())
    }
}

/// File-backed store writing one JSON file per key.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Creates a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        // Keys become file names; reject anything that could escape the
        // store directory.
        if key.is_empty()
            || key
                .chars()
                .any(|c| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        {
            return Err(VoiceBridgeError::Storage {
                message: format!("invalid profile key: {key:?}"),
            });
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl CalibrationStore for JsonFileStore {
    fn load(&self, key: &str) -> Result<Option<CalibrationProfile>> {
        let path = self.path_for(key)?;
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let profile = serde_json::from_str(&contents)?;
        Ok(Some(profile))
    }

    fn save(&self, key: &str, profile: &CalibrationProfile) -> Result<()> {
        let path = self.path_for(key)?;
        let json = serde_json::to_string_pretty(profile)?;
        // Write to a sibling temp file first so readers never see a torn
        // profile.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        debug!(key, path = %path.display(), "calibration profile saved");
        Ok(())
    }
}
