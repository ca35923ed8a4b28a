use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::{ledger::DEFAULT_STORAGE_KEY, timer::DEFAULT_SESSION_SECS};

/// Knobs for the book catalog search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LookupSettings {
    pub lang_restrict: Option<String>,
    pub max_results: u32,
    pub min_query_chars: usize,
}

impl Default for LookupSettings {
    fn default() -> Self {
        Self {
            lang_restrict: Some("ru".into()),
            max_results: 5,
            min_query_chars: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UserSettings {
    /// Baseline a reset returns to.
    pub session_length_secs: u64,
    pub break_length_secs: u64,
    pub storage_key: String,
    pub lookup: LookupSettings,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            session_length_secs: DEFAULT_SESSION_SECS,
            break_length_secs: 5 * 60,
            storage_key: DEFAULT_STORAGE_KEY.into(),
            lookup: LookupSettings::default(),
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn snapshot(&self) -> UserSettings {
        self.read().clone()
    }

    pub fn session_length_secs(&self) -> u64 {
        self.read().session_length_secs
    }

    pub fn break_length_secs(&self) -> u64 {
        self.read().break_length_secs
    }

    pub fn storage_key(&self) -> String {
        self.read().storage_key.clone()
    }

    pub fn lookup(&self) -> LookupSettings {
        self.read().lookup.clone()
    }

    pub fn update(&self, settings: UserSettings) -> Result<()> {
        let mut guard = self.write();
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::temp_path;

    #[test]
    fn missing_file_gives_defaults() {
        let store = SettingsStore::new(temp_path("settings.json")).unwrap();
        assert_eq!(store.session_length_secs(), 1500);
        assert_eq!(store.break_length_secs(), 300);
        assert_eq!(store.storage_key(), "readingProgress");
        assert_eq!(store.lookup().max_results, 5);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let path = temp_path("settings.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{"break_length_secs": 600}"#).unwrap();

        let store = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(store.break_length_secs(), 600);
        assert_eq!(store.session_length_secs(), 1500);
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn update_round_trips_through_disk() {
        let path = temp_path("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();
        let mut settings = store.snapshot();
        settings.session_length_secs = 45 * 60;
        store.update(settings.clone()).unwrap();

        let reopened = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(reopened.snapshot(), settings);
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
