/*!
 * Output generation for the packed codebase
 *
 * Every generator consumes the same prepared view: included files in
 * enumeration order for listings, and the same files sorted by priority for
 * content. Text is read up front (in parallel) and emitted strictly in sorted
 * order, so output never depends on read completion order.
 */

use std::sync::Arc;

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use rayon::prelude::*;
use serde::Serialize;

use crate::error::{PackError, Result};
use crate::exclusion::ExclusionEngine;
use crate::priority::{priority_marker, PriorityStore};
use crate::tokenizer::{estimate_tokens, TokenCount, TokenTier, Tokenizer};
use crate::types::{FileKind, FileRecord, OutputFormat};
use crate::utils::{count_lines, format_kb};
use crate::worker::{process_batch, BatchItem, FileStats};

/// A file whose content could not be read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadWarning {
    pub path: String,
    pub message: String,
}

/// An included file with everything the generators need
#[derive(Debug, Clone)]
pub struct PackedFile<'a> {
    pub file: &'a FileRecord,
    pub priority: u8,
    pub kind: FileKind,
    /// Text content; `None` for non-text files and failed reads
    pub content: Option<Arc<str>>,
}

impl PackedFile<'_> {
    pub fn path(&self) -> &str {
        &self.file.relative_path
    }

    fn star(&self) -> String {
        priority_marker(self.priority)
    }

    fn size_kb(&self) -> String {
        format_kb(self.file.size)
    }

    /// Text file whose content was read
    fn text(&self) -> Option<&str> {
        match self.kind {
            FileKind::Text => self.content.as_deref(),
            _ => None,
        }
    }

    fn is_media(&self) -> bool {
        self.kind == FileKind::Media
    }
}

/// Included files with content loaded, in both orders
#[derive(Debug, Clone)]
pub struct PreparedFiles<'a> {
    included: Vec<PackedFile<'a>>,
    sorted: Vec<usize>,
    warnings: Vec<ReadWarning>,
}

impl<'a> PreparedFiles<'a> {
    /// Included files in enumeration order
    pub fn included(&self) -> &[PackedFile<'a>] {
        &self.included
    }

    /// Included files in priority order
    pub fn sorted(&self) -> impl Iterator<Item = &PackedFile<'a>> + '_ {
        self.sorted.iter().map(move |&idx| &self.included[idx])
    }

    pub fn warnings(&self) -> &[ReadWarning] {
        &self.warnings
    }

    pub fn total_size(&self) -> u64 {
        self.included.iter().map(|f| f.file.size).sum()
    }

    /// Read text files as batch items for statistics
    pub fn batch_items(&self) -> Vec<BatchItem> {
        self.included
            .iter()
            .filter_map(|f| {
                f.text().map(|_| BatchItem {
                    path: f.file.relative_path.clone(),
                    name: f.file.name.clone(),
                    content: f.content.clone().unwrap_or_else(|| Arc::from("")),
                })
            })
            .collect()
    }
}

/// Outcome of a pack
#[derive(Debug, Clone)]
pub struct PackResult {
    pub output: String,
    pub format: OutputFormat,
    /// Number of files not excluded, whatever their kind
    pub included_count: usize,
    pub total_size: u64,
    /// `ceil(chars / 3.5)` over the output
    pub estimated_tokens: usize,
    /// Count from a model tokenizer, when one was used
    pub counted_tokens: Option<TokenCount>,
    pub tier: TokenTier,
    /// Lines over included text files
    pub total_lines: usize,
    pub file_stats: Vec<FileStats>,
    pub warnings: Vec<ReadWarning>,
}

impl PackResult {
    pub fn char_count(&self) -> usize {
        self.output.chars().count()
    }
}

/// Generates artifacts from a file list, its exclusions and priorities
pub struct OutputFormatter<'a> {
    files: &'a [FileRecord],
    engine: &'a ExclusionEngine,
    priorities: &'a PriorityStore,
}

impl<'a> OutputFormatter<'a> {
    pub fn new(
        files: &'a [FileRecord],
        engine: &'a ExclusionEngine,
        priorities: &'a PriorityStore,
    ) -> Self {
        Self {
            files,
            engine,
            priorities,
        }
    }

    /// Files that survive the exclusion engine, in enumeration order
    pub fn included_files(&self) -> Vec<&'a FileRecord> {
        self.files
            .iter()
            .filter(|f| !self.engine.should_exclude(&f.relative_path))
            .collect()
    }

    /// Collect included files, read text content and sort by priority
    ///
    /// A file that cannot be read is kept in listings, left out of content
    /// sections and reported as a warning.
    pub fn prepare(&self) -> PreparedFiles<'a> {
        let included = self.included_files();

        let loaded: Vec<(Option<Arc<str>>, Option<ReadWarning>)> = included
            .par_iter()
            .map(|file| {
                if file.kind() != FileKind::Text {
                    return (None, None);
                }
                match file.read_text() {
                    Ok(text) => (Some(Arc::from(text)), None),
                    Err(e) => {
                        log::warn!("Skipping {}: {}", file.relative_path, e);
                        let warning = ReadWarning {
                            path: file.relative_path.clone(),
                            message: e.to_string(),
                        };
                        (None, Some(warning))
                    }
                }
            })
            .collect();

        let mut warnings = Vec::new();
        let included: Vec<PackedFile<'a>> = included
            .into_iter()
            .zip(loaded)
            .map(|(file, (content, warning))| {
                warnings.extend(warning);
                PackedFile {
                    file,
                    priority: self.priorities.get(&file.relative_path),
                    kind: file.kind(),
                    content,
                }
            })
            .collect();

        let mut sorted: Vec<usize> = (0..included.len()).collect();
        self.priorities
            .sort_by_priority(&mut sorted, |&idx| included[idx].path());

        PreparedFiles {
            included,
            sorted,
            warnings,
        }
    }

    /// Render prepared files in the given format
    pub fn generate(&self, prepared: &PreparedFiles<'_>, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Plain => Ok(plain(prepared)),
            OutputFormat::Xml => xml(prepared),
            OutputFormat::Json => json(prepared),
            OutputFormat::Markdown => Ok(markdown(prepared)),
            OutputFormat::Tree => Ok(tree(prepared)),
        }
    }

    /// Generate the artifact and its statistics
    pub fn pack(
        &self,
        format: OutputFormat,
        tokenizer: Option<&dyn Tokenizer>,
    ) -> Result<PackResult> {
        let prepared = self.prepare();
        let output = self.generate(&prepared, format)?;
        let file_stats = process_batch(&prepared.batch_items());
        finish(output, format, &prepared, file_stats, tokenizer)
    }
}

/// Assemble a [`PackResult`] from generated output and file statistics
pub fn finish(
    output: String,
    format: OutputFormat,
    prepared: &PreparedFiles<'_>,
    file_stats: Vec<FileStats>,
    tokenizer: Option<&dyn Tokenizer>,
) -> Result<PackResult> {
    let estimated_tokens = estimate_tokens(&output);
    let counted_tokens = match tokenizer {
        Some(t) => Some(t.count_tokens(&output)?),
        None => None,
    };
    let total_lines = file_stats.iter().map(|s| s.stats.lines).sum();

    log::info!(
        "Packed {} files as {} (~{} tokens)",
        prepared.included().len(),
        format,
        estimated_tokens
    );

    Ok(PackResult {
        format,
        included_count: prepared.included().len(),
        total_size: prepared.total_size(),
        tier: TokenTier::classify(estimated_tokens),
        estimated_tokens,
        counted_tokens,
        total_lines,
        file_stats,
        warnings: prepared.warnings().to_vec(),
        output,
    })
}

fn plain(prepared: &PreparedFiles<'_>) -> String {
    let mut structure = String::from("Folder Structure:\n");
    let mut media = String::new();

    for file in prepared.included() {
        structure.push_str(&format!("{}{}\n", file.path(), file.star()));
        if file.is_media() {
            media.push_str(&format!(
                "{} ({} KB){}\n",
                file.path(),
                file.size_kb(),
                file.star()
            ));
        }
    }

    let mut output = structure;
    if !media.is_empty() {
        output.push_str("\nMedia/Binary Files (listed but not included):\n");
        output.push_str(&media);
    }

    output.push_str("\nCode Content:\n");
    for file in prepared.sorted() {
        if let Some(text) = file.text() {
            output.push_str(&format!("\n--- {}{} ---\n{}\n", file.path(), file.star(), text));
        }
    }
    output
}

fn xml(prepared: &PreparedFiles<'_>) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new("codebase")))?;

    for file in prepared.sorted() {
        let priority = file.priority.to_string();
        if let Some(text) = file.text() {
            let mut start = BytesStart::new("file");
            start.push_attribute(("path", file.path()));
            if file.priority > 0 {
                start.push_attribute(("priority", priority.as_str()));
            }
            writer.write_event(Event::Start(start))?;
            writer.write_event(Event::Start(BytesStart::new("content")))?;
            for chunk in cdata_chunks(text) {
                writer.write_event(Event::CData(BytesCData::new(chunk)))?;
            }
            writer.write_event(Event::End(BytesEnd::new("content")))?;
            writer.write_event(Event::End(BytesEnd::new("file")))?;
        } else if file.is_media() {
            let size = format!("{}KB", file.size_kb());
            let mut tag = BytesStart::new("media-file");
            tag.push_attribute(("path", file.path()));
            tag.push_attribute(("size", size.as_str()));
            if file.priority > 0 {
                tag.push_attribute(("priority", priority.as_str()));
            }
            writer.write_event(Event::Empty(tag))?;
        }
    }

    writer.write_event(Event::End(BytesEnd::new("codebase")))?;
    String::from_utf8(writer.into_inner())
        .map_err(|e| PackError::Formatter(format!("XML output is not UTF-8: {}", e)))
}

/// Split text so no CDATA section contains `]]>`
///
/// `a]]>b` becomes the sections `a]]` and `>b`.
fn cdata_chunks(text: &str) -> Vec<String> {
    let parts: Vec<&str> = text.split("]]>").collect();
    let last = parts.len() - 1;
    parts
        .iter()
        .enumerate()
        .map(|(idx, part)| {
            let mut chunk = String::with_capacity(part.len() + 3);
            if idx > 0 {
                chunk.push('>');
            }
            chunk.push_str(part);
            if idx < last {
                chunk.push_str("]]");
            }
            chunk
        })
        .collect()
}

#[derive(Serialize)]
struct JsonEntry<'a> {
    path: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<u8>,
}

fn json(prepared: &PreparedFiles<'_>) -> Result<String> {
    let entries: Vec<JsonEntry<'_>> = prepared
        .sorted()
        .filter_map(|file| {
            let priority = (file.priority > 0).then_some(file.priority);
            if let Some(text) = file.text() {
                Some(JsonEntry {
                    path: file.path(),
                    kind: "text",
                    content: Some(text),
                    size: None,
                    priority,
                })
            } else if file.is_media() {
                Some(JsonEntry {
                    path: file.path(),
                    kind: "media",
                    content: None,
                    size: Some(format!("{}KB", file.size_kb())),
                    priority,
                })
            } else {
                None
            }
        })
        .collect();

    Ok(serde_json::to_string_pretty(&entries)?)
}

fn markdown(prepared: &PreparedFiles<'_>) -> String {
    let mut md = String::from("# Codebase Contents\n\n## Table of Contents\n\n");

    let text_files: Vec<(&PackedFile<'_>, &str)> = prepared
        .sorted()
        .filter_map(|f| f.text().map(|text| (f, text)))
        .collect();

    for (idx, (file, _)) in text_files.iter().enumerate() {
        md.push_str(&format!(
            "{}. [{}{}](#file-{})\n",
            idx + 1,
            file.path(),
            file.star(),
            idx
        ));
    }

    md.push_str("\n## Files\n\n");
    for (idx, (file, text)) in text_files.iter().enumerate() {
        let lang = file.file.name.rsplit('.').next().unwrap_or_default();
        md.push_str(&format!("<details id=\"file-{}\">\n", idx));
        md.push_str(&format!(
            "<summary><strong>{}{}</strong></summary>\n\n",
            file.path(),
            file.star()
        ));
        md.push_str(&format!("```{}\n{}\n```\n\n", lang, text));
        md.push_str("</details>\n\n");
    }

    let media: Vec<&PackedFile<'_>> = prepared.sorted().filter(|f| f.is_media()).collect();
    if !media.is_empty() {
        md.push_str("## Media/Binary Files\n\n");
        for file in media {
            md.push_str(&format!(
                "- {}{} ({} KB)\n",
                file.path(),
                file.star(),
                file.size_kb()
            ));
        }
    }
    md
}

/// Tree node keeping children in insertion order
#[derive(Default)]
struct OrderedNode<'p, 'a> {
    children: Vec<(&'p str, OrderedNode<'p, 'a>)>,
    file: Option<&'p PackedFile<'a>>,
}

impl<'p, 'a> OrderedNode<'p, 'a> {
    fn insert(&mut self, file: &'p PackedFile<'a>) {
        let segments: Vec<&'p str> = file.path().split('/').collect();
        let last = segments.len() - 1;
        let mut current = self;
        for (idx, segment) in segments.into_iter().enumerate() {
            let pos = match current.children.iter().position(|(name, _)| *name == segment) {
                Some(pos) => pos,
                None => {
                    let node = OrderedNode {
                        children: Vec::new(),
                        file: (idx == last).then_some(file),
                    };
                    current.children.push((segment, node));
                    current.children.len() - 1
                }
            };
            current = &mut current.children[pos].1;
        }
    }

    fn render(&self, prefix: &str, out: &mut String) {
        let count = self.children.len();
        for (idx, (name, child)) in self.children.iter().enumerate() {
            let is_last = idx + 1 == count;
            let connector = if is_last { "└── " } else { "├── " };
            match child.file {
                Some(file) => {
                    let media = if file.is_media() { " [media]" } else { "" };
                    out.push_str(&format!(
                        "{}{}{}{}{} ({} KB)\n",
                        prefix,
                        connector,
                        name,
                        file.star(),
                        media,
                        file.size_kb()
                    ));
                }
                None => {
                    out.push_str(&format!("{}{}{}/\n", prefix, connector, name));
                    let child_prefix = format!("{}{}", prefix, if is_last { "    " } else { "│   " });
                    child.render(&child_prefix, out);
                }
            }
        }
    }
}

fn tree(prepared: &PreparedFiles<'_>) -> String {
    let mut root = OrderedNode::default();
    for file in prepared.sorted() {
        root.insert(file);
    }

    let mut output = String::from("Project Structure:\n\n");
    root.render("", &mut output);
    output.push_str("\n\nFile Contents:\n\n");

    for file in prepared.sorted() {
        if let Some(text) = file.text() {
            output.push_str(&format!(
                "━━━ {}{} ({} lines) ━━━\n{}\n\n",
                file.path(),
                file.star(),
                count_lines(text),
                text
            ));
        }
    }
    output
}
