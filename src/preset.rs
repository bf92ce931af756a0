/*!
 * Preset filter profiles and the preset export/import document
 */

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::ValueEnum;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::error::{PackError, Result, ResultExt};

const CODE: &[&str] = &[
    "js", "jsx", "ts", "tsx", "py", "java", "c", "cpp", "h", "hpp", "cs", "php", "rb", "swift",
    "kt", "go", "rs", "sql", "html", "css", "scss", "sass", "less", "vue", "svelte", "astro",
];
const DOCS: &[&str] = &["md", "markdown", "txt", "rst", "adoc"];
const CONFIG: &[&str] = &["json", "yaml", "yml", "toml", "ini", "cfg", "conf", "env"];
const DOCS_EXTRA: &[&str] = &["textile", "wiki", "pdf", "doc", "docx"];
const ARCHIVES: &[&str] = &["pdf", "zip", "rar", "7z", "tar", "gz"];
const MEDIA: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "svg", "ico", "bmp", "mp4", "webm", "avi", "mov", "mp3",
    "wav", "ogg", "flac",
];

static CODE_DOCS: Lazy<Vec<&'static str>> = Lazy::new(|| [CODE, DOCS].concat());
static CODE_CONFIG: Lazy<Vec<&'static str>> = Lazy::new(|| [CODE, CONFIG].concat());
static CODE_MEDIA: Lazy<Vec<&'static str>> = Lazy::new(|| [CODE, MEDIA].concat());
static DOCS_ONLY: Lazy<Vec<&'static str>> = Lazy::new(|| [DOCS, DOCS_EXTRA].concat());
static MEDIA_LISTING: Lazy<Vec<&'static str>> = Lazy::new(|| [MEDIA, ARCHIVES].concat());

/// Named extension allow-lists applied on top of the standard exclusions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, ValueEnum)]
#[strum(serialize_all = "kebab-case")]
pub enum Preset {
    CodeOnly,
    CodeDocs,
    CodeConfig,
    DocsOnly,
    CodeMediaList,
    MediaListOnly,
    Full,
}

impl Preset {
    /// Allowed lower-case extensions; `None` allows everything
    pub fn allowed_extensions(&self) -> Option<&'static [&'static str]> {
        match self {
            Preset::CodeOnly => Some(CODE),
            Preset::CodeDocs => Some(CODE_DOCS.as_slice()),
            Preset::CodeConfig => Some(CODE_CONFIG.as_slice()),
            Preset::DocsOnly => Some(DOCS_ONLY.as_slice()),
            Preset::CodeMediaList => Some(CODE_MEDIA.as_slice()),
            Preset::MediaListOnly => Some(MEDIA_LISTING.as_slice()),
            Preset::Full => None,
        }
    }

    /// Whether a file with this extension survives the preset
    pub fn allows(&self, extension: &str) -> bool {
        self.allowed_extensions()
            .map_or(true, |allowed| allowed.contains(&extension))
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Preset::CodeOnly => "Code Only",
            Preset::CodeDocs => "Code + Documentation",
            Preset::CodeConfig => "Code + Config",
            Preset::DocsOnly => "Documentation Only",
            Preset::CodeMediaList => "Code + Media Listing",
            Preset::MediaListOnly => "Media Listing Only",
            Preset::Full => "Full Project",
        }
    }
}

pub const PRESET_FILE_VERSION: &str = "1.0";

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// Shareable custom-pattern preset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetFile {
    pub name: String,
    pub version: String,
    pub custom_patterns: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPresetFile {
    name: Option<String>,
    version: Option<String>,
    #[serde(default)]
    custom_patterns: Option<String>,
    #[serde(default)]
    timestamp: Option<i64>,
}

impl PresetFile {
    /// Create a preset stamped with the current time
    pub fn new(name: impl Into<String>, custom_patterns: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: PRESET_FILE_VERSION.to_string(),
            custom_patterns: custom_patterns.into(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// Pretty JSON document
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate a preset document; `name` and `version` are required
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawPresetFile = serde_json::from_str(json)
            .map_err(|e| PackError::PresetImport(format!("not a preset document: {}", e)))?;

        let name = raw.name.filter(|n| !n.is_empty());
        let version = raw.version.filter(|v| !v.is_empty());
        match (name, version) {
            (Some(name), Some(version)) => Ok(Self {
                name,
                version,
                custom_patterns: raw.custom_patterns.unwrap_or_default(),
                timestamp: raw.timestamp.unwrap_or_default(),
            }),
            _ => Err(PackError::PresetImport(
                "Invalid preset file format".to_string(),
            )),
        }
    }

    /// File name used when exporting
    pub fn export_file_name(&self) -> String {
        let slug = WHITESPACE.replace_all(&self.name.to_lowercase(), "-").into_owned();
        format!("code-packer-preset-{}.json", slug)
    }

    /// Write the preset into `dir` and return the written path
    pub fn export_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(self.export_file_name());
        fs::write(&path, self.to_json()?)
            .with_context(|| format!("Failed to write preset {}", path.display()))?;
        log::info!("Exported preset '{}' to {}", self.name, path.display());
        Ok(path)
    }

    /// Read and validate a preset document from disk
    pub fn import_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| PackError::FileRead {
            path: path.display().to_string(),
            source,
        })?;
        let preset = Self::from_json(&content)?;
        log::info!("Imported preset '{}'", preset.name);
        Ok(preset)
    }
}
