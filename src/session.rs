/*!
 * Per-project state: the file list, exclusions, priorities and output format
 *
 * A [`Session`] is the single owner of everything that changes while a
 * project is open. Mutations and packs take `&mut self`, so a pack can never
 * observe a half-applied toggle or preset, and two packs cannot run at once.
 */

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};

use crate::error::Result;
use crate::exclusion::ExclusionEngine;
use crate::formatter::{finish, OutputFormatter, PackResult};
use crate::preset::{Preset, PresetFile};
use crate::priority::PriorityStore;
use crate::settings::{self, RecentProject, RecentProjects, SettingsStore};
use crate::tokenizer::Tokenizer;
use crate::tree::FolderTree;
use crate::types::{FileRecord, OutputFormat};
use crate::utils::{artifact_file_name, project_root_name};
use crate::worker::{process_batch, TextWorker};

/// How a project's rule sources are initialised
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Read the project's `.gitignore`
    pub use_gitignore: bool,
    /// Comma or newline separated custom patterns
    pub custom_patterns: String,
    /// Where the project came from, for the recent projects list
    pub source_path: Option<PathBuf>,
}

/// Owned state of one open project
pub struct Session {
    files: Vec<FileRecord>,
    tree: FolderTree,
    engine: ExclusionEngine,
    priorities: PriorityStore,
    format: OutputFormat,
    custom_patterns: String,
    settings: Box<dyn SettingsStore>,
    worker: Option<TextWorker>,
    tokenizer: Option<Box<dyn Tokenizer>>,
}

impl Session {
    /// Create an empty session, restoring the format and priorities
    pub fn new(store: Box<dyn SettingsStore>) -> Self {
        let format = settings::load_format(store.as_ref());
        let priorities = settings::load_priorities(store.as_ref());
        log::debug!(
            "Session restored format {} with {} priorities",
            format,
            priorities.len()
        );
        Self {
            files: Vec::new(),
            tree: FolderTree::from_paths(std::iter::empty()),
            engine: ExclusionEngine::new(),
            priorities,
            format,
            custom_patterns: String::new(),
            settings: store,
            worker: None,
            tokenizer: None,
        }
    }

    /// Offload statistics to a background worker
    pub fn with_worker(mut self, worker: TextWorker) -> Self {
        self.worker = Some(worker);
        self
    }

    /// Count output tokens exactly with a model tokenizer
    pub fn with_tokenizer(mut self, tokenizer: Box<dyn Tokenizer>) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    /// Replace the project: reset rules, load sources, auto-exclude, rebuild the tree
    pub fn load_project(&mut self, files: Vec<FileRecord>, options: LoadOptions) -> Result<()> {
        let mut engine = ExclusionEngine::new();
        if options.use_gitignore {
            engine.load_gitignore(&files);
        }
        engine.set_custom_patterns(&options.custom_patterns);
        engine.apply_auto_exclusions(&files);

        self.tree = FolderTree::build(&files);
        self.engine = engine;
        self.custom_patterns = options.custom_patterns;
        self.files = files;

        if let Some(name) = self.project_name().map(String::from) {
            let path = options
                .source_path
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| name.clone());
            let mut recent = RecentProjects::load(self.settings.as_ref());
            recent.record(RecentProject::new(name, path, self.files.len()));
            recent.save(self.settings.as_mut())?;
        }

        log::info!(
            "Loaded {} files, {} excluded",
            self.files.len(),
            self.excluded_count()
        );
        Ok(())
    }

    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    pub fn tree(&self) -> &FolderTree {
        &self.tree
    }

    pub fn engine(&self) -> &ExclusionEngine {
        &self.engine
    }

    pub fn priorities(&self) -> &PriorityStore {
        &self.priorities
    }

    pub fn project_name(&self) -> Option<&str> {
        project_root_name(&self.files)
    }

    /// Prefix `path` with the project root folder unless it already starts with it
    pub fn qualify_path(&self, path: &str) -> String {
        let path = path.trim_start_matches("./").trim_end_matches('/');
        match self.project_name() {
            Some(root) if path != root && !path.starts_with(&format!("{}/", root)) => {
                format!("{}/{}", root, path)
            }
            _ => path.to_string(),
        }
    }

    /// Number of files currently excluded
    pub fn excluded_count(&self) -> usize {
        self.files
            .iter()
            .filter(|f| self.engine.should_exclude(&f.relative_path))
            .count()
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Select and persist the output format
    pub fn set_format(&mut self, format: OutputFormat) -> Result<()> {
        self.format = format;
        settings::save_format(self.settings.as_mut(), format)
    }

    pub fn custom_patterns(&self) -> &str {
        &self.custom_patterns
    }

    /// Replace the custom patterns and re-run auto exclusion
    pub fn set_custom_patterns(&mut self, input: &str) {
        self.custom_patterns = input.to_string();
        self.engine.set_custom_patterns(input);
        self.engine.apply_auto_exclusions(&self.files);
    }

    /// Include or exclude a file or folder; unknown paths are ignored
    pub fn toggle(&mut self, path: &str, include: bool) -> bool {
        self.engine.toggle_exclusion(path, include, &self.files)
    }

    pub fn apply_preset(&mut self, preset: Preset) {
        self.engine.apply_preset(preset, &self.files);
    }

    /// Set and persist one file's priority
    pub fn set_priority(&mut self, path: &str, priority: u8) -> Result<()> {
        self.priorities.set(path, priority)?;
        settings::save_priorities(self.settings.as_mut(), &self.priorities)
    }

    /// Advance and persist one file's priority
    pub fn cycle_priority(&mut self, path: &str) -> Result<u8> {
        let next = self.priorities.cycle(path);
        settings::save_priorities(self.settings.as_mut(), &self.priorities)?;
        Ok(next)
    }

    pub fn clear_priorities(&mut self) -> Result<()> {
        self.priorities.clear();
        settings::save_priorities(self.settings.as_mut(), &self.priorities)
    }

    /// Load a preset document and apply its custom patterns
    pub fn import_preset(&mut self, path: &Path) -> Result<PresetFile> {
        let preset = PresetFile::import_from(path)?;
        if !preset.custom_patterns.is_empty() {
            self.set_custom_patterns(&preset.custom_patterns);
        }
        Ok(preset)
    }

    /// Write the current custom patterns as a named preset document
    pub fn export_preset(&self, name: &str, dir: &Path) -> Result<PathBuf> {
        PresetFile::new(name, self.custom_patterns.clone()).export_to(dir)
    }

    pub fn recent_projects(&self) -> RecentProjects {
        RecentProjects::load(self.settings.as_ref())
    }

    /// File name for saving the artifact
    pub fn artifact_name<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        artifact_file_name(self.project_name().unwrap_or("project"), at)
    }

    /// Generate the artifact in the current format
    pub fn pack(&mut self) -> Result<PackResult> {
        let formatter = OutputFormatter::new(&self.files, &self.engine, &self.priorities);
        let prepared = formatter.prepare();
        let output = formatter.generate(&prepared, self.format)?;

        let file_stats = match &self.worker {
            Some(worker) => worker.process_batch(prepared.batch_items())?,
            None => process_batch(&prepared.batch_items()),
        };

        finish(
            output,
            self.format,
            &prepared,
            file_stats,
            self.tokenizer.as_deref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{MemoryStore, FILE_PRIORITIES_KEY, OUTPUT_FORMAT_KEY};
    use serde_json::Value;

    fn project() -> Vec<FileRecord> {
        vec![
            FileRecord::in_memory("demo/src/main.rs", "fn main() {}\n"),
            FileRecord::in_memory("demo/README.md", "# Demo"),
            FileRecord::in_memory("demo/.gitignore", "secret/\n"),
            FileRecord::in_memory("demo/secret/key.txt", "hunter2"),
            FileRecord::in_memory("demo/node_modules/x/index.js", "x"),
        ]
    }

    fn session() -> Session {
        let mut session = Session::new(Box::new(MemoryStore::new()));
        session
            .load_project(
                project(),
                LoadOptions {
                    use_gitignore: true,
                    ..Default::default()
                },
            )
            .unwrap();
        session
    }

    #[test]
    fn test_load_applies_all_sources() {
        let session = session();
        assert_eq!(session.project_name(), Some("demo"));
        assert!(session.engine().should_exclude("demo/secret/key.txt"));
        assert!(session.engine().should_exclude("demo/node_modules/x/index.js"));
        assert_eq!(session.excluded_count(), 2);
        assert_eq!(session.recent_projects().entries()[0].name, "demo");
    }

    #[test]
    fn test_restores_persisted_state() {
        let mut store = MemoryStore::new();
        store
            .set(OUTPUT_FORMAT_KEY, Value::String("json".into()))
            .unwrap();
        store
            .set(FILE_PRIORITIES_KEY, serde_json::json!({"demo/README.md": 5}))
            .unwrap();

        let session = Session::new(Box::new(store));
        assert_eq!(session.format(), OutputFormat::Json);
        assert_eq!(session.priorities().get("demo/README.md"), 5);
    }

    #[test]
    fn test_pack_orders_by_priority() {
        let mut session = session();
        session.set_priority("demo/README.md", 5).unwrap();
        let result = session.pack().unwrap();
        let readme = result.output.find("--- demo/README.md").unwrap();
        let main = result.output.find("--- demo/src/main.rs").unwrap();
        assert!(readme < main);
        assert_eq!(result.included_count, 3);
        assert!(!result.output.contains("hunter2"));
    }

    #[test]
    fn test_pack_with_worker_matches_inline() {
        let mut inline = session();
        let mut threaded = session().with_worker(TextWorker::spawn().unwrap());
        let a = inline.pack().unwrap();
        let b = threaded.pack().unwrap();
        assert_eq!(a.output, b.output);
        assert_eq!(a.file_stats, b.file_stats);
        assert_eq!(a.total_lines, 5);
    }

    #[test]
    fn test_custom_patterns_reapply() {
        let mut session = session();
        session.set_custom_patterns("*.md");
        assert!(session.engine().should_exclude("demo/README.md"));
        assert_eq!(session.custom_patterns(), "*.md");
    }

    #[test]
    fn test_toggle_then_pack() {
        let mut session = session();
        assert!(session.toggle("demo/secret", true));
        assert!(session.pack().unwrap().output.contains("hunter2"));
        assert!(!session.toggle("demo/nowhere", false));
    }

    #[test]
    fn test_preset_export_import() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = session();
        source.set_custom_patterns("*.md, fixtures");
        let path = source.export_preset("Team Rules", dir.path()).unwrap();
        assert!(path.ends_with("code-packer-preset-team-rules.json"));

        let mut target = session();
        let preset = target.import_preset(&path).unwrap();
        assert_eq!(preset.name, "Team Rules");
        assert!(target.engine().should_exclude("demo/README.md"));
    }

    #[test]
    fn test_qualify_path() {
        let session = session();
        assert_eq!(session.qualify_path("src/main.rs"), "demo/src/main.rs");
        assert_eq!(session.qualify_path("./secret/"), "demo/secret");
        assert_eq!(session.qualify_path("demo/README.md"), "demo/README.md");
        assert_eq!(session.qualify_path("demo"), "demo");
    }

    #[test]
    fn test_cycle_and_clear_priorities() {
        let mut session = session();
        assert_eq!(session.cycle_priority("demo/src/main.rs").unwrap(), 1);
        session.clear_priorities().unwrap();
        assert!(session.priorities().is_empty());
    }
}
