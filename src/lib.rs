/*!
 * codepack - Filter a project folder and pack it into one artifact for LLM context
 *
 * Files are enumerated once, filtered through default, `.gitignore` and
 * custom exclusion rules (plus explicit toggles and extension presets),
 * ordered by user priority, and serialized as plain text, XML, JSON,
 * Markdown or an annotated tree.
 */

pub mod clipboard;
pub mod config;
pub mod error;
pub mod exclusion;
pub mod formatter;
pub mod pattern;
pub mod preset;
pub mod priority;
pub mod report;
pub mod scanner;
pub mod session;
pub mod settings;
pub mod tokenizer;
pub mod tree;
pub mod types;
pub mod utils;
pub mod worker;


// Re-export main components for easier access
pub use config::Config;
pub use error::{PackError, Result};
pub use exclusion::ExclusionEngine;
pub use formatter::{OutputFormatter, PackResult};
pub use pattern::Pattern;
pub use preset::{Preset, PresetFile};
pub use priority::PriorityStore;
pub use report::{PackReport, Reporter};
pub use scanner::Scanner;
pub use session::{LoadOptions, Session};
pub use tree::FolderTree;
pub use types::{FileKind, FileRecord, OutputFormat};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
