/*!
 * Core types and data structures for codepack
 */

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::utils::{is_media_file, is_text_file};

/// Capability to read a file's text content on demand
pub trait ReadText: Send + Sync + fmt::Debug {
    /// Read the whole content as UTF-8 text
    fn read_text(&self) -> io::Result<String>;
}

/// Text read from a file on disk
#[derive(Debug, Clone)]
pub struct DiskText {
    path: PathBuf,
}

impl DiskText {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl ReadText for DiskText {
    fn read_text(&self) -> io::Result<String> {
        fs::read_to_string(&self.path)
    }
}

/// Text held in memory
#[derive(Debug, Clone)]
pub struct MemoryText(pub String);

impl ReadText for MemoryText {
    fn read_text(&self) -> io::Result<String> {
        Ok(self.0.clone())
    }
}

/// One enumerated project file. Identity is `relative_path`.
#[derive(Debug, Clone)]
pub struct FileRecord {
    /// Posix-separated path, starting with the project root folder name
    pub relative_path: String,
    /// Final path segment
    pub name: String,
    /// Size in bytes
    pub size: u64,
    content: Arc<dyn ReadText>,
}

impl FileRecord {
    /// Create a record backed by an arbitrary content reader
    pub fn new(relative_path: impl Into<String>, size: u64, content: Arc<dyn ReadText>) -> Self {
        let relative_path = relative_path.into();
        let name = relative_path
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        Self {
            relative_path,
            name,
            size,
            content,
        }
    }

    /// Create a record whose content is read from disk when needed
    pub fn on_disk(relative_path: impl Into<String>, abs_path: PathBuf, size: u64) -> Self {
        Self::new(relative_path, size, Arc::new(DiskText::new(abs_path)))
    }

    /// Create a record with in-memory content; size is the byte length
    pub fn in_memory(relative_path: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        let size = content.len() as u64;
        Self::new(relative_path, size, Arc::new(MemoryText(content)))
    }

    /// Read the file's text content
    pub fn read_text(&self) -> io::Result<String> {
        self.content.read_text()
    }

    /// Classify the file by name
    pub fn kind(&self) -> FileKind {
        if is_media_file(&self.name) {
            FileKind::Media
        } else if is_text_file(&self.name) {
            FileKind::Text
        } else {
            FileKind::Other
        }
    }
}

/// Classification of a file by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Content is read and embedded
    Text,
    /// Listed with its size, content never read
    Media,
    /// Listed in structure sections only
    Other,
}

/// Selectable output artifact format
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    ValueEnum,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Folder structure, media listing and `--- path ---` blocks
    #[default]
    Plain,
    /// `<codebase>` document with CDATA content
    Xml,
    /// Array of file objects
    Json,
    /// Table of contents with collapsible sections
    Markdown,
    /// ASCII tree followed by file dumps
    Tree,
}

/// A node of the folder tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    /// Segment name
    pub name: String,
    /// Whether this node is a file (leaf)
    pub is_file: bool,
    /// Full relative path up to and including this segment
    pub path: String,
    /// Child nodes by name; empty for files
    pub children: BTreeMap<String, TreeNode>,
}

/// One entry of a depth-first flattened tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatItem<'a> {
    pub name: &'a str,
    pub node: &'a TreeNode,
    pub depth: usize,
}
