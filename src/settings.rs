/*!
 * Persisted settings: output format, file priorities and recent projects
 *
 * Settings live in a flat JSON object. [`JsonFileStore`] keeps it in a file
 * under the user's config directory; [`MemoryStore`] is used by tests and
 * one-off runs.
 */

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{PackError, Result};
use crate::priority::PriorityStore;
use crate::types::OutputFormat;

pub const OUTPUT_FORMAT_KEY: &str = "outputFormat";
pub const FILE_PRIORITIES_KEY: &str = "filePriorities";
pub const RECENT_PROJECTS_KEY: &str = "recentProjects";

/// Number of recent projects kept
pub const MAX_RECENT_PROJECTS: usize = 5;

/// String-keyed JSON value store
pub trait SettingsStore {
    fn get(&self, key: &str) -> Option<&Value>;

    fn set(&mut self, key: &str, value: Value) -> Result<()>;

    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Settings kept only in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Map<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

/// Settings persisted to a JSON file, written on every change
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    values: Map<String, Value>,
}

impl JsonFileStore {
    /// Default location: `<config dir>/codepack/settings.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("codepack").join("settings.json"))
    }

    /// Open the store; a missing file starts empty, an unreadable one is
    /// logged and replaced on the next write
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Map<String, Value>>(&content) {
                Ok(values) => values,
                Err(e) => {
                    log::warn!("Ignoring malformed settings {}: {}", path.display(), e);
                    Map::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => {
                log::warn!("Cannot read settings {}: {}", path.display(), e);
                Map::new()
            }
        };
        log::debug!("Opened settings {} ({} keys)", path.display(), values.len());
        Self { path, values }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        let settings_error = |message: String| PackError::Settings {
            path: self.path.clone(),
            message,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| settings_error(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(&self.values)?;
        fs::write(&self.path, json).map_err(|e| settings_error(e.to_string()))
    }
}

impl SettingsStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.values.insert(key.to_string(), value);
        self.save()
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if self.values.remove(key).is_some() {
            self.save()?;
        }
        Ok(())
    }
}

/// Stored output format, `plain` when unset or unknown
pub fn load_format(store: &dyn SettingsStore) -> OutputFormat {
    store
        .get(OUTPUT_FORMAT_KEY)
        .and_then(Value::as_str)
        .and_then(|s| match OutputFormat::from_str(s) {
            Ok(format) => Some(format),
            Err(_) => {
                log::warn!("Unknown stored output format '{}'", s);
                None
            }
        })
        .unwrap_or_default()
}

pub fn save_format(store: &mut dyn SettingsStore, format: OutputFormat) -> Result<()> {
    store.set(OUTPUT_FORMAT_KEY, Value::String(format.to_string()))
}

/// Stored priorities; a malformed entry yields an empty store
pub fn load_priorities(store: &dyn SettingsStore) -> PriorityStore {
    let Some(value) = store.get(FILE_PRIORITIES_KEY) else {
        return PriorityStore::new();
    };
    match serde_json::from_value::<BTreeMap<String, u8>>(value.clone()) {
        Ok(map) => PriorityStore::from_map(map),
        Err(e) => {
            log::warn!("Ignoring malformed stored priorities: {}", e);
            PriorityStore::new()
        }
    }
}

/// Persist priorities; an empty store removes the key
pub fn save_priorities(store: &mut dyn SettingsStore, priorities: &PriorityStore) -> Result<()> {
    if priorities.is_empty() {
        return store.remove(FILE_PRIORITIES_KEY);
    }
    store.set(FILE_PRIORITIES_KEY, serde_json::to_value(priorities.as_map())?)
}

/// A recently packed project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentProject {
    pub name: String,
    pub path: String,
    pub file_count: usize,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl RecentProject {
    pub fn new(name: impl Into<String>, path: impl Into<String>, file_count: usize) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            file_count,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

/// Most recent first, unique by path, at most [`MAX_RECENT_PROJECTS`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecentProjects {
    entries: Vec<RecentProject>,
}

impl RecentProjects {
    pub fn load(store: &dyn SettingsStore) -> Self {
        let entries = store
            .get(RECENT_PROJECTS_KEY)
            .map(|value| {
                serde_json::from_value::<Vec<RecentProject>>(value.clone()).unwrap_or_else(|e| {
                    log::warn!("Error loading recent projects: {}", e);
                    Vec::new()
                })
            })
            .unwrap_or_default();
        Self { entries }
    }

    /// Move `project` to the front, dropping older entries for its path
    pub fn record(&mut self, project: RecentProject) {
        self.entries.retain(|p| p.path != project.path);
        self.entries.insert(0, project);
        self.entries.truncate(MAX_RECENT_PROJECTS);
    }

    pub fn save(&self, store: &mut dyn SettingsStore) -> Result<()> {
        store.set(RECENT_PROJECTS_KEY, serde_json::to_value(&self.entries)?)
    }

    pub fn clear(store: &mut dyn SettingsStore) -> Result<()> {
        store.remove(RECENT_PROJECTS_KEY)
    }

    pub fn entries(&self) -> &[RecentProject] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_format_defaults_and_persists() {
        let mut store = MemoryStore::new();
        assert_eq!(load_format(&store), OutputFormat::Plain);
        save_format(&mut store, OutputFormat::Markdown).unwrap();
        assert_eq!(load_format(&store), OutputFormat::Markdown);

        store
            .set(OUTPUT_FORMAT_KEY, Value::String("yaml".into()))
            .unwrap();
        assert_eq!(load_format(&store), OutputFormat::Plain);
    }

    #[test]
    fn test_priorities_round_trip() {
        let mut store = MemoryStore::new();
        let mut priorities = PriorityStore::new();
        priorities.set("p/a.rs", 4).unwrap();
        save_priorities(&mut store, &priorities).unwrap();
        assert_eq!(
            store.get(FILE_PRIORITIES_KEY),
            Some(&serde_json::json!({"p/a.rs": 4}))
        );
        assert_eq!(load_priorities(&store), priorities);

        priorities.clear();
        save_priorities(&mut store, &priorities).unwrap();
        assert!(store.get(FILE_PRIORITIES_KEY).is_none());
    }

    #[test]
    fn test_malformed_priorities_are_ignored() {
        let mut store = MemoryStore::new();
        store
            .set(FILE_PRIORITIES_KEY, Value::String("oops".into()))
            .unwrap();
        assert!(load_priorities(&store).is_empty());
    }

    #[test]
    fn test_recent_projects_bounded_and_deduplicated() {
        let mut recent = RecentProjects::default();
        for i in 0..7 {
            recent.record(RecentProject::new(format!("p{}", i), format!("/src/p{}", i), i));
        }
        recent.record(RecentProject::new("p4 again", "/src/p4", 40));

        let paths: Vec<&str> = recent.entries().iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, vec!["/src/p4", "/src/p6", "/src/p5", "/src/p3", "/src/p2"]);
        assert_eq!(recent.entries()[0].file_count, 40);

        let mut store = MemoryStore::new();
        recent.save(&mut store).unwrap();
        assert_eq!(RecentProjects::load(&store), recent);
        assert!(store.get(RECENT_PROJECTS_KEY).unwrap()[0]
            .get("fileCount")
            .is_some());
    }

    #[test]
    fn test_json_file_store_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut store = JsonFileStore::open(&path);
        save_format(&mut store, OutputFormat::Xml).unwrap();

        let reopened = JsonFileStore::open(&path);
        assert_eq!(load_format(&reopened), OutputFormat::Xml);
    }

    #[test]
    fn test_json_file_store_recovers_from_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();

        let mut store = JsonFileStore::open(&path);
        assert!(store.get(OUTPUT_FORMAT_KEY).is_none());
        save_format(&mut store, OutputFormat::Tree).unwrap();
        assert_eq!(load_format(&JsonFileStore::open(&path)), OutputFormat::Tree);
    }
}
