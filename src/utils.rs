/*!
 * Utility functions and file classification tables for codepack
 */

use chrono::{DateTime, TimeZone};
use once_cell::sync::Lazy;

use crate::types::FileRecord;

/// Extensions whose content is read and embedded in the output
pub static TEXT_EXTENSIONS: &[&str] = &[
    "txt", "js", "jsx", "ts", "tsx", "html", "css", "scss", "sass", "less", "json", "xml", "md",
    "markdown", "py", "java", "c", "cpp", "h", "hpp", "cs", "php", "rb", "swift", "kt", "go", "rs",
    "sql", "yaml", "yml", "toml", "ini", "cfg", "conf", "sh", "bash", "env", "gitignore",
    "dockerfile", "vue", "svelte", "astro", "graphql", "prisma", "csv", "tsv",
];

/// Extensions listed with metadata only
pub static MEDIA_EXTENSIONS: &[&str] = &[
    // Images
    "png", "jpg", "jpeg", "gif", "bmp", "svg", "ico", "webp", "tiff", "tif",
    // Audio
    "mp3", "wav", "ogg", "flac", "aac", "m4a", "wma",
    // Video
    "mp4", "avi", "mov", "wmv", "flv", "mkv", "webm", "mpeg", "mpg",
    // Fonts
    "ttf", "otf", "woff", "woff2", "eot",
    // Archives
    "zip", "rar", "7z", "tar", "gz", "bz2",
    // Documents
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx",
];

/// Built-in exclusions: directory names, file names and simple wildcards
pub static DEFAULT_EXCLUSIONS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        // JavaScript/Node.js
        "node_modules",
        "package-lock.json",
        "yarn.lock",
        "pnpm-lock.yaml",
        "npm-debug.log",
        "yarn-error.log",
        ".next",
        ".nuxt",
        // Python
        "__pycache__",
        "*.pyc",
        "*.pyo",
        "*.pyd",
        ".Python",
        "venv",
        "env",
        "ENV",
        "virtualenv",
        ".pytest_cache",
        "*.egg-info",
        "dist",
        "build",
        ".tox",
        // Java
        "target",
        "*.class",
        "*.jar",
        "*.war",
        "*.ear",
        // .NET
        "bin",
        "obj",
        "*.dll",
        "*.exe",
        "*.pdb",
        // Ruby
        "vendor/bundle",
        "*.gem",
        ".bundle",
        // Go
        "vendor",
        "*.test",
        // Rust
        "Cargo.lock",
        // Version Control
        ".git",
        ".svn",
        ".hg",
        // Caches & Temp
        ".cache",
        "cache",
        "tmp",
        "temp",
        "coverage",
        ".nyc_output",
        // Environment files
        ".env",
        ".env.local",
        ".env.development",
        ".env.production",
        ".env.test",
        // IDEs & Editors
        ".vscode",
        ".idea",
        ".DS_Store",
        "Thumbs.db",
        "*.swp",
        "*.swo",
        "*~",
    ]
});

/// Lower-cased text after the last `.`; the whole name when there is no dot
pub fn extension_of(name: &str) -> String {
    name.rsplit('.').next().unwrap_or(name).to_lowercase()
}

/// Whether a file's content should be read as text
pub fn is_text_file(name: &str) -> bool {
    let ext = extension_of(name);
    TEXT_EXTENSIONS.contains(&ext.as_str()) || name.to_lowercase().ends_with("gitignore")
}

/// Whether a file is media/binary and only listed
pub fn is_media_file(name: &str) -> bool {
    MEDIA_EXTENSIONS.contains(&extension_of(name).as_str())
}

/// Format a human-readable file size
pub fn format_file_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}

/// Size in kilobytes with two decimals, as used inside generated artifacts
pub fn format_kb(size: u64) -> String {
    format!("{:.2}", size as f64 / 1024.0)
}

/// Number of lines as counted in artifacts: segments separated by `\n`
pub fn count_lines(content: &str) -> usize {
    content.split('\n').count()
}

/// The project root folder name, taken from the first file's path
pub fn project_root_name(files: &[FileRecord]) -> Option<&str> {
    files
        .first()
        .and_then(|f| f.relative_path.split('/').next())
        .filter(|s| !s.is_empty())
}

/// Download file name: `{root}_{YYYY-MM-DD}_{HHMM}.txt`, whatever the format
pub fn artifact_file_name<Tz: TimeZone>(project_root: &str, at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{}_{}.txt", project_root, at.format("%Y-%m-%d_%H%M"))
}
