/*!
 * Configuration handling for codepack
 */

use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser};
use clap_complete::Shell;

use crate::error::Result;
use crate::preset::Preset;
use crate::priority::parse_assignment;
use crate::settings::JsonFileStore;
use crate::tokenizer::Model;
use crate::tree::LARGE_TREE_THRESHOLD;
use crate::types::OutputFormat;
use crate::{bail, ensure};

/// Command-line arguments for codepack
#[derive(Parser, Debug, Clone)]
#[clap(
    name = "codepack",
    version = env!("CARGO_PKG_VERSION"),
    about = "Filter a project folder and pack it into a single text artifact for LLM context",
    long_about = "Scans a project folder, drops dependencies, build output and anything matched by .gitignore or custom patterns, then serializes the remaining files as plain text, XML, JSON, Markdown or an annotated tree."
)]
pub struct Args {
    /// Project directory to pack
    #[clap(default_value = ".")]
    pub directory_path: String,

    /// Output file (default: <project>_<date>_<time>.txt in the current directory)
    #[clap(short, long)]
    pub output: Option<String>,

    /// Write the artifact to stdout instead of a file
    #[clap(long, conflicts_with = "output")]
    pub stdout: bool,

    /// Output format; the last used format when omitted
    #[clap(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Restrict the project to a named extension preset
    #[clap(long, value_enum)]
    pub preset: Option<Preset>,

    /// Custom exclusion patterns, comma separated
    #[clap(long, action = ArgAction::Append)]
    pub exclude: Vec<String>,

    /// Include a file or folder that would otherwise be excluded
    #[clap(long, value_name = "PATH")]
    pub include_path: Vec<String>,

    /// Exclude a file or folder
    #[clap(long, value_name = "PATH")]
    pub exclude_path: Vec<String>,

    /// Set a file priority, e.g. `src/main.rs=5`; 0 clears it
    #[clap(long, value_name = "PATH=N")]
    pub priority: Vec<String>,

    /// Forget all stored file priorities
    #[clap(long)]
    pub clear_priorities: bool,

    /// Ignore the project's .gitignore
    #[clap(long)]
    pub no_gitignore: bool,

    /// Load custom patterns from a preset file
    #[clap(long, value_name = "FILE")]
    pub import_preset: Option<String>,

    /// Save the custom patterns as a named preset file in the current directory
    #[clap(long, value_name = "NAME")]
    pub export_preset: Option<String>,

    /// Count tokens exactly for this model
    #[clap(long, value_enum)]
    pub model: Option<Model>,

    /// Settings file location
    #[clap(long, value_name = "FILE")]
    pub settings: Option<String>,

    /// Number of threads to use for reading files
    #[clap(long, default_value = "4")]
    pub threads: usize,

    /// File count above which the tree is shown in chunks
    #[clap(long, default_value_t = LARGE_TREE_THRESHOLD)]
    pub large_tree_threshold: usize,

    /// Print the file tree with exclusion marks
    #[clap(long)]
    pub show_tree: bool,

    /// Copy output to clipboard
    #[clap(long, help = "Copy output to system clipboard")]
    pub clip: bool,

    /// Generate shell completions
    #[clap(long = "generate", value_enum)]
    pub generate: Option<Shell>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[clap(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors and skip the report
    #[clap(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Where the artifact goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// A named file
    File(PathBuf),
    /// The generated artifact name, in the current directory
    Artifact,
    Stdout,
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// Project directory to pack
    pub target_dir: PathBuf,

    /// Where the artifact is written
    pub output: OutputTarget,

    /// Explicit format, persisted when given
    pub format: Option<OutputFormat>,

    pub preset: Option<Preset>,

    /// Custom patterns joined with commas
    pub custom_patterns: String,

    pub include_paths: Vec<String>,

    pub exclude_paths: Vec<String>,

    /// Parsed `path=N` assignments
    pub priorities: Vec<(String, u8)>,

    pub clear_priorities: bool,

    /// Whether to read the project's .gitignore
    pub respect_gitignore: bool,

    pub import_preset: Option<PathBuf>,

    pub export_preset: Option<String>,

    /// Model for exact token counts
    pub model: Option<Model>,

    /// Settings file, `None` when no config directory is known
    pub settings_path: Option<PathBuf>,

    /// Number of threads to use for reading files
    pub num_threads: usize,

    pub large_tree_threshold: usize,

    pub show_tree: bool,

    /// Copy output to clipboard
    pub clip: bool,

    pub verbose: u8,

    pub quiet: bool,
}

impl Config {
    /// Create configuration from command-line arguments
    pub fn from_args(args: Args) -> Result<Self> {
        let output = if args.stdout {
            OutputTarget::Stdout
        } else {
            match args.output {
                Some(path) => OutputTarget::File(PathBuf::from(path)),
                None => OutputTarget::Artifact,
            }
        };

        let priorities = args
            .priority
            .iter()
            .map(|p| parse_assignment(p))
            .collect::<Result<Vec<_>>>()?;

        let custom_patterns = args
            .exclude
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(",");

        Ok(Self {
            target_dir: PathBuf::from(args.directory_path),
            output,
            format: args.format,
            preset: args.preset,
            custom_patterns,
            include_paths: args.include_path,
            exclude_paths: args.exclude_path,
            priorities,
            clear_priorities: args.clear_priorities,
            respect_gitignore: !args.no_gitignore,
            import_preset: args.import_preset.map(PathBuf::from),
            export_preset: args.export_preset,
            model: args.model,
            settings_path: args
                .settings
                .map(PathBuf::from)
                .or_else(JsonFileStore::default_path),
            num_threads: args.threads,
            large_tree_threshold: args.large_tree_threshold,
            show_tree: args.show_tree,
            clip: args.clip,
            verbose: args.verbose,
            quiet: args.quiet,
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.target_dir.is_dir() {
            bail!(
                PathNotFound,
                "Target directory not found: {}",
                self.target_dir.display()
            );
        }

        if let OutputTarget::File(path) = &self.output {
            if let Some(parent) = path.parent() {
                ensure!(
                    parent == Path::new("") || parent.is_dir(),
                    PathNotFound,
                    "Output directory not found: {}",
                    parent.display()
                );
            }
        }

        if let Some(path) = &self.import_preset {
            ensure!(
                path.is_file(),
                PathNotFound,
                "Preset file not found: {}",
                path.display()
            );
        }

        ensure!(
            self.num_threads > 0,
            Config,
            "Thread count must be at least 1"
        );
        ensure!(
            self.large_tree_threshold > 0,
            Config,
            "Large tree threshold must be at least 1"
        );

        Ok(())
    }

    /// Log filter derived from `-v`/`-q`
    pub fn log_level(&self) -> log::LevelFilter {
        if self.quiet {
            return log::LevelFilter::Error;
        }
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PackError;

    fn parse(args: &[&str]) -> Config {
        let args = Args::try_parse_from(std::iter::once("codepack").chain(args.iter().copied()))
            .unwrap();
        Config::from_args(args).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]);
        assert_eq!(config.target_dir, PathBuf::from("."));
        assert_eq!(config.output, OutputTarget::Artifact);
        assert!(config.respect_gitignore);
        assert_eq!(config.large_tree_threshold, 500);
        assert_eq!(config.format, None);
        assert_eq!(config.log_level(), log::LevelFilter::Warn);
    }

    #[test]
    fn test_full_command_line() {
        let config = parse(&[
            "proj",
            "--stdout",
            "-f",
            "json",
            "--preset",
            "docs-only",
            "--exclude",
            "*.log, fixtures",
            "--exclude",
            "tmp",
            "--priority",
            "proj/a.rs=5",
            "--no-gitignore",
            "-vv",
        ]);
        assert_eq!(config.output, OutputTarget::Stdout);
        assert_eq!(config.format, Some(OutputFormat::Json));
        assert_eq!(config.preset, Some(Preset::DocsOnly));
        assert_eq!(config.custom_patterns, "*.log, fixtures,tmp");
        assert_eq!(config.priorities, vec![("proj/a.rs".to_string(), 5)]);
        assert!(!config.respect_gitignore);
        assert_eq!(config.log_level(), log::LevelFilter::Debug);
    }

    #[test]
    fn test_bad_priority_rejected() {
        let args = Args::try_parse_from(["codepack", "--priority", "a.rs=9"]).unwrap();
        assert!(matches!(
            Config::from_args(args),
            Err(PackError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_validate_missing_directory() {
        let config = parse(&["/definitely/not/here"]);
        assert!(matches!(config.validate(), Err(PackError::PathNotFound(_))));
    }

    #[test]
    fn test_stdout_conflicts_with_output() {
        assert!(Args::try_parse_from(["codepack", "--stdout", "-o", "x.txt"]).is_err());
    }
}
