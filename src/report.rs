/*!
 * Pack summary reporting for codepack
 *
 * Renders a [`PackResult`] as console tables using the tabled library.
 */

use std::time::Duration;

use tabled::{
    settings::{object::Columns, Alignment, Modify, Padding, Style},
    Table, Tabled,
};

use crate::formatter::PackResult;
use crate::utils::format_file_size;

/// Files listed in full up to this count; beyond it only the largest are shown
const FULL_LISTING_LIMIT: usize = 15;
const TOP_FILES: usize = 10;
const PATH_WIDTH: usize = 60;

/// Everything the summary needs about one pack
#[derive(Debug, Clone)]
pub struct PackReport<'a> {
    pub result: &'a PackResult,
    /// Where the artifact went, e.g. a file path or "clipboard"
    pub destination: String,
    /// Time taken to scan and pack
    pub duration: Duration,
    /// Files excluded from the artifact
    pub excluded_count: usize,
}

/// Report generator for pack results
#[derive(Debug, Default)]
pub struct Reporter;

impl Reporter {
    pub fn new() -> Self {
        Self
    }

    /// Print the report to stderr, keeping stdout free for the artifact
    pub fn print_report(&self, report: &PackReport<'_>) {
        eprintln!("\n{}", self.generate_report(report));
    }

    /// Files table followed by the summary table
    pub fn generate_report(&self, report: &PackReport<'_>) -> String {
        let stats = &report.result.file_stats;
        let files_title = if stats.len() > FULL_LISTING_LIMIT {
            "📋  TOP 10 LARGEST FILES BY CHARACTER COUNT"
        } else {
            "📋  PACKED FILES"
        };

        let mut out = String::new();
        if !stats.is_empty() {
            out.push_str(&format!("{}\n{}\n\n", files_title, self.files_table(report)));
        }
        out.push_str(&format!(
            "✅  PACK COMPLETE\n{}",
            self.summary_table(report)
        ));

        if !report.result.warnings.is_empty() {
            out.push_str("\n\n⚠️  UNREADABLE FILES\n");
            for warning in &report.result.warnings {
                out.push_str(&format!(
                    "  {}: {}\n",
                    format_path(&warning.path, PATH_WIDTH),
                    warning.message
                ));
            }
        }
        out
    }

    fn summary_table(&self, report: &PackReport<'_>) -> String {
        #[derive(Tabled)]
        struct SummaryRow {
            #[tabled(rename = "Metric")]
            key: String,

            #[tabled(rename = "Value")]
            value: String,
        }

        let result = report.result;
        let row = |key: &str, value: String| SummaryRow {
            key: key.to_string(),
            value,
        };

        let mut rows = vec![
            row("📂 Output", report.destination.clone()),
            row("🧾 Format", result.format.to_string()),
            row("⏱️ Process Time", format!("{:.4?}", report.duration)),
            row(
                "📄 Files Included",
                format!(
                    "{} ({} excluded)",
                    format_number(result.included_count),
                    format_number(report.excluded_count)
                ),
            ),
            row("💾 Total Size", format_file_size(result.total_size)),
            row("📝 Total Lines", format_number(result.total_lines)),
            row("🔤 Characters", format_number(result.char_count())),
            row(
                "📦 LLM Tokens",
                format!("{} tokens (estimated)", format_number(result.estimated_tokens)),
            ),
        ];

        if let Some(counted) = result.counted_tokens.filter(|c| c.exact) {
            rows.push(row(
                "🎯 Counted Tokens",
                format!("{} tokens (counted)", format_number(counted.tokens)),
            ));
        }

        rows.push(row("📊 Budget", result.tier.to_string()));

        if !result.warnings.is_empty() {
            rows.push(row("⚠️ Read Warnings", result.warnings.len().to_string()));
        }

        styled(Table::new(rows))
    }

    fn files_table(&self, report: &PackReport<'_>) -> String {
        #[derive(Tabled)]
        struct FileRow {
            #[tabled(rename = "File Path")]
            path: String,

            #[tabled(rename = "Lines")]
            lines: String,

            #[tabled(rename = "Est. Tokens")]
            tokens: String,
        }

        let mut files: Vec<_> = report.result.file_stats.iter().collect();
        files.sort_by(|a, b| b.stats.chars.cmp(&a.stats.chars));
        if files.len() > FULL_LISTING_LIMIT {
            files.truncate(TOP_FILES);
        }

        let rows: Vec<FileRow> = files
            .iter()
            .map(|file| FileRow {
                path: format_path(&file.path, PATH_WIDTH),
                lines: format_number(file.stats.lines),
                tokens: format_number(file.stats.tokens),
            })
            .collect();

        styled(Table::new(rows))
    }
}

fn styled(mut table: Table) -> String {
    table
        .with(Style::rounded())
        .with(Padding::new(1, 1, 0, 0))
        .with(Modify::new(Columns::new(..)).with(Alignment::left()));
    table.to_string()
}

/// Format a number with human-readable units
pub fn format_number(num: usize) -> String {
    if num >= 1_000_000 {
        format!("{:.1}M", num as f64 / 1_000_000.0)
    } else if num >= 1_000 {
        format!("{:.1}K", num as f64 / 1_000.0)
    } else {
        num.to_string()
    }
}

/// Keep the trailing segments of a long path behind `...`
pub fn format_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let mut segments = Vec::new();
    let mut len = 3;
    for part in path.rsplit('/') {
        let part_len = part.chars().count() + 1;
        if len + part_len > max_len {
            break;
        }
        segments.push(part);
        len += part_len;
    }

    if segments.is_empty() {
        let tail: String = path
            .chars()
            .rev()
            .take(max_len.saturating_sub(3))
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        return format!("...{}", tail);
    }

    let mut result = String::from("...");
    for part in segments.iter().rev() {
        result.push('/');
        result.push_str(part);
    }
    result
}
