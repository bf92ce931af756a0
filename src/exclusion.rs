/*!
 * Exclusion rules: built-in defaults, `.gitignore`, custom patterns and
 * manual toggles, folded into one set of excluded paths
 */

use std::collections::HashSet;
use std::str::FromStr;

use once_cell::sync::Lazy;

use crate::pattern::{basename, parse_gitignore, split_custom_patterns, Pattern};
use crate::preset::Preset;
use crate::types::FileRecord;
use crate::utils::{extension_of, DEFAULT_EXCLUSIONS};

/// A list of raw patterns with their wildcard forms prepared
#[derive(Debug, Clone, Default)]
pub struct PatternList {
    entries: Vec<(String, Option<Pattern>)>,
}

impl PatternList {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        let entries = patterns
            .iter()
            .map(|p| {
                let raw = p.as_ref().to_string();
                let wildcard = raw.contains('*').then(|| Pattern::new(&raw));
                (raw, wildcard)
            })
            .collect();
        Self { entries }
    }

    /// True if a path segment or the basename equals an entry, or the
    /// basename matches a wildcard entry
    pub fn matches(&self, path: &str) -> bool {
        let name = basename(path);
        self.entries.iter().any(|(raw, wildcard)| {
            path.split('/').any(|segment| segment == raw)
                || name == raw
                || wildcard.as_ref().is_some_and(|w| w.matches(name))
        })
    }

    pub fn raw(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(raw, _)| raw.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

static DEFAULT_PATTERNS: Lazy<PatternList> = Lazy::new(|| PatternList::new(&DEFAULT_EXCLUSIONS));

/// Whether a path is hit by the built-in exclusion list
pub fn is_default_excluded(path: &str) -> bool {
    DEFAULT_PATTERNS.matches(path)
}

/// Whether a path is hit by an arbitrary pattern list
pub fn matches_pattern_list<S: AsRef<str>>(path: &str, patterns: &[S]) -> bool {
    !patterns.is_empty() && PatternList::new(patterns).matches(path)
}

/// Owns the excluded-path set and the three rule sources
#[derive(Debug, Clone, Default)]
pub struct ExclusionEngine {
    excluded: HashSet<String>,
    gitignore: PatternList,
    custom: PatternList,
}

impl ExclusionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the excluded set and the gitignore and custom patterns
    pub fn reset(&mut self) {
        self.excluded.clear();
        self.gitignore = PatternList::default();
        self.custom = PatternList::default();
    }

    /// Whether a path or any of its ancestors is excluded
    pub fn should_exclude(&self, path: &str) -> bool {
        if self.excluded.is_empty() {
            return false;
        }
        if self.excluded.contains(path) {
            return true;
        }
        path.match_indices('/')
            .any(|(idx, _)| self.excluded.contains(&path[..idx]))
    }

    pub fn excluded_paths(&self) -> &HashSet<String> {
        &self.excluded
    }

    pub fn gitignore_patterns(&self) -> Vec<&str> {
        self.gitignore.raw().collect()
    }

    pub fn custom_patterns(&self) -> Vec<&str> {
        self.custom.raw().collect()
    }

    /// Replace the gitignore patterns with those parsed from `content`
    pub fn set_gitignore(&mut self, content: &str) {
        let patterns = parse_gitignore(content);
        log::debug!("Loaded {} .gitignore patterns", patterns.len());
        self.gitignore = PatternList::new(&patterns);
    }

    /// Find the project's `.gitignore` in the file list and load it
    ///
    /// The shallowest file named `.gitignore` wins. A read failure leaves the
    /// gitignore list empty.
    pub fn load_gitignore(&mut self, files: &[FileRecord]) {
        let Some(file) = files
            .iter()
            .filter(|f| f.name == ".gitignore")
            .min_by_key(|f| f.relative_path.matches('/').count())
        else {
            self.gitignore = PatternList::default();
            return;
        };

        match file.read_text() {
            Ok(content) => self.set_gitignore(&content),
            Err(e) => {
                log::warn!("Error reading {}: {}", file.relative_path, e);
                self.gitignore = PatternList::default();
            }
        }
    }

    /// Replace the custom patterns; input is split on commas and newlines
    pub fn set_custom_patterns(&mut self, input: &str) {
        let patterns = split_custom_patterns(input);
        log::debug!("Using {} custom patterns", patterns.len());
        self.custom = PatternList::new(&patterns);
    }

    /// Whether any of the three rule sources hits the path
    pub fn is_auto_excluded(&self, path: &str) -> bool {
        is_default_excluded(path) || self.gitignore.matches(path) || self.custom.matches(path)
    }

    /// Add every file hit by a rule source to the excluded set
    pub fn apply_auto_exclusions(&mut self, files: &[FileRecord]) {
        let hits: Vec<String> = files
            .iter()
            .filter(|f| self.is_auto_excluded(&f.relative_path))
            .map(|f| f.relative_path.clone())
            .collect();
        log::debug!("Auto-excluded {} of {} files", hits.len(), files.len());
        self.excluded.extend(hits);
    }

    /// Include or exclude a path together with all of its descendants
    ///
    /// Returns false, leaving the set untouched, when `path` is neither a
    /// file nor a folder of the file list.
    pub fn toggle_exclusion(&mut self, path: &str, include: bool, files: &[FileRecord]) -> bool {
        let prefix = format!("{}/", path);
        let affected: Vec<&str> = files
            .iter()
            .map(|f| f.relative_path.as_str())
            .filter(|p| *p == path || p.starts_with(&prefix))
            .collect();

        if affected.is_empty() {
            log::debug!("Ignoring toggle of unknown path: {}", path);
            return false;
        }

        if include {
            self.excluded.remove(path);
            for p in affected {
                self.excluded.remove(p);
            }
        } else {
            self.excluded.insert(path.to_string());
            self.excluded.extend(affected.into_iter().map(String::from));
        }
        log::trace!(
            "{} {}",
            if include { "Included" } else { "Excluded" },
            path
        );
        true
    }

    /// Rebuild the excluded set from the rule sources, then drop every file
    /// whose extension the preset does not allow
    pub fn apply_preset(&mut self, preset: Preset, files: &[FileRecord]) {
        let mut next = HashSet::new();
        for file in files {
            let path = &file.relative_path;
            if self.is_auto_excluded(path) || !preset.allows(&extension_of(&file.name)) {
                next.insert(path.clone());
            }
        }
        log::debug!(
            "Preset '{}' excludes {} of {} files",
            preset,
            next.len(),
            files.len()
        );
        self.excluded = next;
    }

    /// Apply a preset by id; unknown ids are ignored
    pub fn apply_preset_id(&mut self, preset_id: &str, files: &[FileRecord]) -> bool {
        match Preset::from_str(preset_id) {
            Ok(preset) => {
                self.apply_preset(preset, files);
                true
            }
            Err(_) => {
                log::debug!("Unknown preset '{}'", preset_id);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(paths: &[&str]) -> Vec<FileRecord> {
        paths.iter().map(|p| FileRecord::in_memory(*p, "x")).collect()
    }

    #[test]
    fn test_default_exclusions() {
        assert!(is_default_excluded("node_modules/lodash/index.js"));
        assert!(is_default_excluded("proj/src/__pycache__/m.pyc"));
        assert!(is_default_excluded("proj/app/module.pyc"));
        assert!(is_default_excluded("proj/.env"));
        assert!(is_default_excluded("proj/notes.txt~"));
        assert!(!is_default_excluded("proj/src/main.rs"));
        assert!(!is_default_excluded("proj/environment.md"));
    }

    #[test]
    fn test_pattern_list_three_way_match() {
        let patterns = ["secrets", "*.log", "Makefile"];
        assert!(matches_pattern_list("p/secrets/key.pem", &patterns));
        assert!(matches_pattern_list("p/logs/app.log", &patterns));
        assert!(matches_pattern_list("p/Makefile", &patterns));
        assert!(!matches_pattern_list("p/src/secret.rs", &patterns));
        let empty: [&str; 0] = [];
        assert!(!matches_pattern_list("p/a", &empty));
    }

    #[test]
    fn test_pattern_list_bare_name_hits_inner_segment() {
        // lists match any segment; matches_wildcard alone is suffix-only
        assert!(matches_pattern_list("a/b/c.js", &["b"]));
        assert!(!crate::pattern::matches_wildcard("a/b/c.js", "b"));
    }

    #[test]
    fn test_ancestor_prefix_excludes() {
        let list = files(&["p/a/b/c.rs", "p/a/d.rs", "p/ab.rs"]);
        let mut engine = ExclusionEngine::new();
        assert!(engine.toggle_exclusion("p/a", false, &list));
        engine.excluded.retain(|p| p == "p/a");

        assert!(engine.should_exclude("p/a/b/c.rs"));
        assert!(engine.should_exclude("p/a/d.rs"));
        assert!(engine.should_exclude("p/a"));
        assert!(!engine.should_exclude("p/ab.rs"));
        assert!(!engine.should_exclude("p"));
    }

    #[test]
    fn test_toggle_round_trip() {
        let list = files(&["p/src/a.rs", "p/src/deep/b.rs", "p/readme.md", "p/node_modules/x.js"]);
        let mut engine = ExclusionEngine::new();
        engine.apply_auto_exclusions(&list);
        let before: Vec<bool> = list.iter().map(|f| engine.should_exclude(&f.relative_path)).collect();

        engine.toggle_exclusion("p/src", false, &list);
        assert!(engine.should_exclude("p/src/a.rs"));
        assert!(engine.should_exclude("p/src/deep/b.rs"));
        assert!(!engine.should_exclude("p/readme.md"));

        engine.toggle_exclusion("p/src", true, &list);
        let after: Vec<bool> = list.iter().map(|f| engine.should_exclude(&f.relative_path)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_including_default_excluded_folder() {
        let list = files(&["p/node_modules/x/index.js", "p/main.js"]);
        let mut engine = ExclusionEngine::new();
        engine.apply_auto_exclusions(&list);
        assert!(engine.should_exclude("p/node_modules/x/index.js"));

        engine.toggle_exclusion("p/node_modules", true, &list);
        assert!(!engine.should_exclude("p/node_modules/x/index.js"));
    }

    #[test]
    fn test_toggle_unknown_path_is_noop() {
        let list = files(&["p/a.rs"]);
        let mut engine = ExclusionEngine::new();
        assert!(!engine.toggle_exclusion("p/missing", false, &list));
        assert!(engine.excluded_paths().is_empty());
    }

    #[test]
    fn test_gitignore_and_custom_sources() {
        let mut list = files(&["p/out/gen.rs", "p/src/lib.rs", "p/debug.log", "p/fixtures/f.json"]);
        list.push(FileRecord::in_memory("p/.gitignore", "# build\n/out/\n*.log\n"));

        let mut engine = ExclusionEngine::new();
        engine.load_gitignore(&list);
        assert_eq!(engine.gitignore_patterns(), vec!["out", "*.log"]);
        engine.set_custom_patterns("fixtures");
        engine.apply_auto_exclusions(&list);

        assert!(engine.should_exclude("p/out/gen.rs"));
        assert!(engine.should_exclude("p/debug.log"));
        assert!(engine.should_exclude("p/fixtures/f.json"));
        assert!(!engine.should_exclude("p/src/lib.rs"));
        assert!(!engine.should_exclude("p/.gitignore"));
    }

    #[test]
    fn test_custom_patterns_replace() {
        let mut engine = ExclusionEngine::new();
        engine.set_custom_patterns("a, b");
        engine.set_custom_patterns("c");
        assert_eq!(engine.custom_patterns(), vec!["c"]);
    }

    #[test]
    fn test_reset_keeps_defaults() {
        let list = files(&["p/dist/app.js", "p/x.log"]);
        let mut engine = ExclusionEngine::new();
        engine.set_custom_patterns("*.log");
        engine.apply_auto_exclusions(&list);
        engine.reset();
        assert!(engine.excluded_paths().is_empty());
        assert!(engine.custom_patterns().is_empty());

        engine.apply_auto_exclusions(&list);
        assert!(engine.should_exclude("p/dist/app.js"));
        assert!(!engine.should_exclude("p/x.log"));
    }

    #[test]
    fn test_docs_only_preset() {
        let list = files(&["readme.md", "index.js", "notes.txt"]);
        let mut engine = ExclusionEngine::new();
        engine.apply_preset(Preset::DocsOnly, &list);
        assert!(engine.should_exclude("index.js"));
        assert!(!engine.should_exclude("readme.md"));
        assert!(!engine.should_exclude("notes.txt"));
    }

    #[test]
    fn test_preset_clears_manual_toggles() {
        let list = files(&["p/a.rs", "p/b.rs", "p/node_modules/m.js"]);
        let mut engine = ExclusionEngine::new();
        engine.toggle_exclusion("p/a.rs", false, &list);
        engine.apply_preset(Preset::Full, &list);
        assert!(!engine.should_exclude("p/a.rs"));
        assert!(engine.should_exclude("p/node_modules/m.js"));
    }

    #[test]
    fn test_unknown_preset_id_is_noop() {
        let list = files(&["p/a.rs"]);
        let mut engine = ExclusionEngine::new();
        engine.toggle_exclusion("p/a.rs", false, &list);
        assert!(!engine.apply_preset_id("everything", &list));
        assert!(engine.should_exclude("p/a.rs"));
        assert!(engine.apply_preset_id("full", &list));
        assert!(!engine.should_exclude("p/a.rs"));
    }
}
