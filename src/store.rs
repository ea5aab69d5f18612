//! JSON-backed profile store.
//!
//! Holds every named profile plus the one currently selected. Each mutation is written
//! through to disk immediately; a failed write rolls the in-memory change back so the
//! store never disagrees with the file it was loaded from.

use crate::error::StoreError;
use crate::model::Profile;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_PROFILE: &str = "Default";

/// On-disk layout of the store file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    configs: BTreeMap<String, Profile>,
    #[serde(default)]
    last: Option<String>,
}

#[derive(Debug)]
pub struct ProfileStore {
    path: PathBuf,
    profiles: BTreeMap<String, Profile>,
    current: String,
}

impl ProfileStore {
    /// Load the store from `path`. Never fails: unreadable or corrupt files yield a
    /// store with a single blank "Default" profile.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<StoreFile>(&raw) {
                Ok(f) => f,
                Err(e) => {
                    tracing::warn!(path = %path.display(), "ignoring corrupt profile file: {e}");
                    StoreFile::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no profile file yet");
                StoreFile::default()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "failed to read profile file: {e}");
                StoreFile::default()
            }
        };

        let mut profiles = file.configs;
        if profiles.is_empty() {
            profiles.insert(DEFAULT_PROFILE.to_string(), Profile::default());
        }
        let current = match file.last {
            Some(name) if profiles.contains_key(&name) => name,
            _ => profiles
                .keys()
                .next()
                .cloned()
                .unwrap_or_else(|| DEFAULT_PROFILE.to_string()),
        };
        tracing::info!(
            path = %path.display(),
            profiles = profiles.len(),
            current = %current,
            "loaded profiles"
        );

        Self {
            path,
            profiles,
            current,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Profile names in sorted order.
    pub fn list_names(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }

    /// The named profile, or a blank one if it does not exist.
    pub fn get(&self, name: &str) -> Profile {
        self.profiles.get(name).cloned().unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    pub fn current_name(&self) -> &str {
        &self.current
    }

    pub fn current(&self) -> Profile {
        self.get(&self.current)
    }

    /// Switch the current profile without persisting. Returns false for unknown names.
    pub fn select(&mut self, name: &str) -> bool {
        if self.profiles.contains_key(name) {
            self.current = name.to_string();
            true
        } else {
            false
        }
    }

    /// Insert or overwrite `name`, make it current and persist.
    pub fn save(&mut self, name: &str, profile: Profile) -> Result<(), StoreError> {
        let previous = self.profiles.insert(name.to_string(), profile);
        let previous_current = std::mem::replace(&mut self.current, name.to_string());

        if let Err(e) = self.persist() {
            match previous {
                Some(p) => {
                    self.profiles.insert(name.to_string(), p);
                }
                None => {
                    self.profiles.remove(name);
                }
            }
            self.current = previous_current;
            tracing::error!(name, "save failed, in-memory state rolled back: {e}");
            return Err(e);
        }
        tracing::info!(name, "saved profile");
        Ok(())
    }

    /// Save under a new, unused name.
    pub fn save_as(&mut self, new_name: &str, profile: Profile) -> Result<(), StoreError> {
        let name = new_name.trim();
        if name.is_empty() {
            return Err(StoreError::BlankName);
        }
        if self.profiles.contains_key(name) {
            return Err(StoreError::DuplicateName(name.to_string()));
        }
        self.save(name, profile)
    }

    fn persist(&self) -> Result<(), StoreError> {
        let file = StoreFile {
            configs: self.profiles.clone(),
            last: Some(self.current.clone()),
        };
        let json = serde_json::to_string_pretty(&file)?;
        write_atomic(&self.path, json.as_bytes()).map_err(|source| StoreError::Storage {
            path: self.path.clone(),
            source,
        })
    }
}

/// Write to a sibling temp file, then rename over the target.
fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path).inspect_err(|_| {
        let _ = fs::remove_file(&tmp);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Setting;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn scratch_dir() -> PathBuf {
        static N: AtomicUsize = AtomicUsize::new(0);
        let dir = std::env::temp_dir().join(format!(
            "openocd-launcher-store-{}-{}",
            std::process::id(),
            N.fetch_add(1, Ordering::Relaxed)
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn sample() -> Profile {
        Profile {
            openocd_path: "/opt/oocd".into(),
            interface: Setting::new("ftdi"),
            target: Setting::disabled("stm32f4x"),
            gdb_port: Setting::new("3333"),
            custom_configs: vec!["/home/me/board.cfg".into()],
            pre_cmds: vec!["init".into()],
            custom_cmds: vec!["reset halt".into()],
            ..Default::default()
        }
    }

    fn assert_default_only(store: &ProfileStore) {
        assert_eq!(store.list_names(), vec![DEFAULT_PROFILE.to_string()]);
        assert_eq!(store.current_name(), DEFAULT_PROFILE);
        assert_eq!(store.current(), Profile::default());
    }

    #[test]
    fn missing_file_yields_default_profile() {
        let dir = scratch_dir();
        let store = ProfileStore::load(dir.join("configs.json"));
        assert_default_only(&store);
    }

    #[test]
    fn corrupt_file_yields_default_profile() {
        let dir = scratch_dir();
        let path = dir.join("configs.json");
        fs::write(&path, "{ not json").unwrap();
        assert_default_only(&ProfileStore::load(&path));

        fs::write(&path, r#"{"configs": [1, 2, 3]}"#).unwrap();
        assert_default_only(&ProfileStore::load(&path));
    }

    #[test]
    fn empty_configs_materialize_default() {
        let dir = scratch_dir();
        let path = dir.join("configs.json");
        fs::write(&path, r#"{"configs": {}, "last": "gone"}"#).unwrap();
        assert_default_only(&ProfileStore::load(&path));
    }

    #[test]
    fn unknown_last_falls_back_to_first_name() {
        let dir = scratch_dir();
        let path = dir.join("configs.json");
        fs::write(
            &path,
            r#"{"configs": {"beta": {}, "alpha": {"openocd_path": "/x"}}, "last": "gamma"}"#,
        )
        .unwrap();
        let store = ProfileStore::load(&path);
        assert_eq!(store.current_name(), "alpha");
        assert_eq!(store.list_names(), vec!["alpha", "beta"]);
        assert_eq!(store.current().openocd_path, "/x");
    }

    #[test]
    fn get_after_save_returns_same_profile() {
        let dir = scratch_dir();
        let mut store = ProfileStore::load(dir.join("configs.json"));
        store.save("board", sample()).unwrap();
        assert_eq!(store.get("board"), sample());
        assert_eq!(store.current_name(), "board");
    }

    #[test]
    fn get_unknown_returns_blank_profile() {
        let dir = scratch_dir();
        let store = ProfileStore::load(dir.join("configs.json"));
        assert_eq!(store.get("nope"), Profile::default());
    }

    #[test]
    fn saved_state_survives_reload() {
        let dir = scratch_dir();
        let path = dir.join("nested").join("configs.json");
        let mut store = ProfileStore::load(&path);
        store.save_as("board", sample()).unwrap();

        let reloaded = ProfileStore::load(&path);
        assert_eq!(reloaded.current_name(), "board");
        assert_eq!(reloaded.list_names(), vec!["Default", "board"]);
        let p = reloaded.get("board");
        assert_eq!(p.interface, Setting::new("ftdi"));
        // Disabled flags are not persisted; a non-empty value reads back as enabled.
        assert_eq!(p.target, Setting::new("stm32f4x"));
        assert_eq!(p.pre_cmds, vec!["init"]);
    }

    #[test]
    fn persisted_file_uses_expected_keys() {
        let dir = scratch_dir();
        let path = dir.join("configs.json");
        let mut store = ProfileStore::load(&path);
        store.save("board", sample()).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["last"], "board");
        let board = &raw["configs"]["board"];
        assert_eq!(board["openocd_path"], "/opt/oocd");
        assert_eq!(board["interface"], "ftdi");
        assert_eq!(board["gdb_port"], "3333");
        assert_eq!(board["custom_cmds"][0], "reset halt");
    }

    #[test]
    fn save_as_duplicate_leaves_store_unchanged() {
        let dir = scratch_dir();
        let path = dir.join("configs.json");
        let mut store = ProfileStore::load(&path);
        store.save("board", sample()).unwrap();
        store.select(DEFAULT_PROFILE);

        let err = store.save_as("board", Profile::default()).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateName(ref n) if n == "board"));
        assert_eq!(store.get("board"), sample());
        assert_eq!(store.current_name(), DEFAULT_PROFILE);

        let err = store.save_as("  board ", Profile::default()).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateName(_)));
    }

    #[test]
    fn save_as_rejects_blank_names() {
        let dir = scratch_dir();
        let mut store = ProfileStore::load(dir.join("configs.json"));
        assert!(matches!(
            store.save_as("", sample()),
            Err(StoreError::BlankName)
        ));
        assert!(matches!(
            store.save_as("   ", sample()),
            Err(StoreError::BlankName)
        ));
        assert_eq!(store.list_names(), vec![DEFAULT_PROFILE.to_string()]);
    }

    #[test]
    fn save_as_trims_name() {
        let dir = scratch_dir();
        let mut store = ProfileStore::load(dir.join("configs.json"));
        store.save_as("  lab  ", sample()).unwrap();
        assert!(store.contains("lab"));
        assert_eq!(store.current_name(), "lab");
    }

    #[test]
    fn failed_write_rolls_back() {
        let dir = scratch_dir();
        // A directory at the store path makes the final rename fail.
        let path = dir.join("configs.json");
        fs::create_dir_all(&path).unwrap();
        let mut store = ProfileStore::load(&path);
        assert_default_only(&store);

        let err = store.save("board", sample()).unwrap_err();
        assert!(matches!(err, StoreError::Storage { .. }));
        assert!(!store.contains("board"));
        assert_eq!(store.current_name(), DEFAULT_PROFILE);

        let err = store.save(DEFAULT_PROFILE, sample()).unwrap_err();
        assert!(matches!(err, StoreError::Storage { .. }));
        assert_eq!(store.get(DEFAULT_PROFILE), Profile::default());
    }

    #[test]
    fn select_switches_only_known_names() {
        let dir = scratch_dir();
        let mut store = ProfileStore::load(dir.join("configs.json"));
        store.save("board", sample()).unwrap();
        assert!(store.select(DEFAULT_PROFILE));
        assert_eq!(store.current_name(), DEFAULT_PROFILE);
        assert!(!store.select("missing"));
        assert_eq!(store.current_name(), DEFAULT_PROFILE);
    }
}
