//! Client-side state store — four independent JSON slots, each a whole
//! record written and read as one value. A missing or corrupt slot reads
//! as absent; it is never a fatal error.

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use lumen_core::error::{LumenError, Result};

pub const SLOT_THEME_SETTINGS: &str = "theme_settings";
pub const SLOT_ACTIVE_THEME: &str = "active_theme";
pub const SLOT_FAVORITE_THEME: &str = "favorite_theme";
pub const SLOT_APP_SETTINGS: &str = "app_settings";

/// Generic app settings slot (chat defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppSettings {
    pub provider: Option<String>,
    pub model: Option<String>,
}

/// File-backed slot store under the Lumen data directory.
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn open_default() -> Self {
        Self::new(Self::default_dir())
    }

    pub fn default_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lumen")
    }

    fn slot_path(&self, slot: &str) -> PathBuf {
        self.dir.join(format!("{}.json", slot))
    }

    /// Read a slot. Missing or unparseable slots read as `None`.
    pub fn load<T: DeserializeOwned>(&self, slot: &str) -> Option<T> {
        let path = self.slot_path(slot);
        let content = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("ignoring corrupt state slot {}: {}", slot, e);
                None
            }
        }
    }

    /// Overwrite a slot with a whole new value.
    pub fn save<T: Serialize>(&self, slot: &str, value: &T) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let content = serde_json::to_string_pretty(value)?;
        std::fs::write(self.slot_path(slot), content)
            .map_err(|e| LumenError::Store(format!("failed to write slot {}: {}", slot, e)))
    }

    /// Delete a slot. Absent slots are fine.
    pub fn clear(&self, slot: &str) -> Result<()> {
        match std::fs::remove_file(self.slot_path(slot)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LumenError::Store(format!(
                "failed to clear slot {}: {}",
                slot, e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::theme::ThemeSettings;
    use tempfile::tempdir;

    #[test]
    fn save_and_load_round_trip() {
        let tmp = tempdir().unwrap();
        let store = StateStore::new(tmp.path().to_path_buf());

        let settings = ThemeSettings {
            auto_generate: true,
            ..Default::default()
        };
        store.save(SLOT_THEME_SETTINGS, &settings).unwrap();

        let loaded: ThemeSettings = store.load(SLOT_THEME_SETTINGS).unwrap();
        assert!(loaded.auto_generate);
    }

    #[test]
    fn missing_slot_reads_as_absent() {
        let tmp = tempdir().unwrap();
        let store = StateStore::new(tmp.path().to_path_buf());
        assert!(store.load::<ThemeSettings>(SLOT_THEME_SETTINGS).is_none());
    }

    #[test]
    fn corrupt_slot_reads_as_absent() {
        let tmp = tempdir().unwrap();
        let store = StateStore::new(tmp.path().to_path_buf());
        std::fs::write(tmp.path().join("theme_settings.json"), "{not json").unwrap();
        assert!(store.load::<ThemeSettings>(SLOT_THEME_SETTINGS).is_none());
    }

    #[test]
    fn clear_is_idempotent() {
        let tmp = tempdir().unwrap();
        let store = StateStore::new(tmp.path().to_path_buf());
        store.clear(SLOT_ACTIVE_THEME).unwrap();
        store
            .save(SLOT_ACTIVE_THEME, &AppSettings::default())
            .unwrap();
        store.clear(SLOT_ACTIVE_THEME).unwrap();
        assert!(store.load::<AppSettings>(SLOT_ACTIVE_THEME).is_none());
    }
}
