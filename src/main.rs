/*!
 * Command-line interface for codepack
 */

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use clap::{CommandFactory, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::ThreadPoolBuilder;

use codepack::clipboard::copy_to_clipboard;
use codepack::config::{Args, Config, OutputTarget};
use codepack::error::PackError;
use codepack::report::{PackReport, Reporter};
use codepack::scanner::Scanner;
use codepack::session::{LoadOptions, Session};
use codepack::settings::{JsonFileStore, MemoryStore, SettingsStore};
use codepack::tokenizer::create_tokenizer;
use codepack::tree::RenderMode;
use codepack::worker::TextWorker;

fn main() -> io::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    if let Some(shell) = args.generate {
        let mut cmd = Args::command();
        clap_complete::generate(shell, &mut cmd, "codepack", &mut io::stdout());
        return Ok(());
    }

    let config = Config::from_args(args)?;

    env_logger::Builder::new()
        .filter_level(config.log_level())
        .parse_default_env()
        .init();

    config.validate()?;

    // Configure thread pool
    if let Err(e) = ThreadPoolBuilder::new()
        .num_threads(config.num_threads)
        .build_global()
    {
        log::warn!("Failed to set thread pool size: {}", e);
    }

    let progress = if config.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(0)
    };
    match ProgressStyle::default_bar().template(
        "{spinner:.green} {prefix:.bold.cyan} {wide_msg:.dim.white} {pos}/{len} ⏱️  {elapsed_precise}",
    ) {
        Ok(style) => progress.set_style(style),
        Err(e) => log::debug!("Falling back to the default progress style: {}", e),
    }
    progress.enable_steady_tick(Duration::from_millis(100));
    progress.set_prefix("📊 Scanning");
    progress.set_message(format!("📂 {}", config.target_dir.display()));

    let start_time = Instant::now();

    let scanner = Scanner::new(&config.target_dir).with_progress(Arc::new(progress.clone()));
    match scanner.count_files() {
        Ok(count) => progress.set_length(count),
        Err(e) => log::warn!("Failed to count files: {}", e),
    }
    let files = scanner.scan()?;
    progress.finish_and_clear();

    let mut session = Session::new(open_settings(&config)).with_worker(TextWorker::spawn()?);
    if config.model.is_some() {
        let tokenizer = create_tokenizer(config.model).map_err(PackError::from)?;
        session = session.with_tokenizer(tokenizer);
    }

    session.load_project(
        files,
        LoadOptions {
            use_gitignore: config.respect_gitignore,
            custom_patterns: config.custom_patterns.clone(),
            source_path: fs::canonicalize(&config.target_dir).ok(),
        },
    )?;

    if let Some(path) = &config.import_preset {
        let preset = session.import_preset(path)?;
        log::info!("Using custom patterns from preset '{}'", preset.name);
    }

    if let Some(preset) = config.preset {
        log::info!("Applying preset {}", preset.label());
        session.apply_preset(preset);
    }

    for (paths, include) in [(&config.include_paths, true), (&config.exclude_paths, false)] {
        for path in paths {
            let path = session.qualify_path(path);
            if !session.toggle(&path, include) {
                log::warn!("No file or folder matches '{}'", path);
            }
        }
    }

    if config.clear_priorities {
        session.clear_priorities()?;
    }
    for (path, priority) in &config.priorities {
        let path = session.qualify_path(path);
        session.set_priority(&path, *priority)?;
    }

    if let Some(format) = config.format {
        session.set_format(format)?;
    }

    if let Some(name) = &config.export_preset {
        let path = session.export_preset(name, &std::env::current_dir()?)?;
        eprintln!("Preset written to {}", path.display());
    }

    if config.show_tree {
        print_tree(&session, config.large_tree_threshold);
    }

    let result = session.pack()?;
    for warning in &result.warnings {
        log::warn!("Could not read {}: {}", warning.path, warning.message);
    }

    let destination = match &config.output {
        OutputTarget::Stdout => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(result.output.as_bytes())?;
            stdout.flush()?;
            "stdout".to_string()
        }
        OutputTarget::File(path) => write_artifact(path.clone(), &result.output)?,
        OutputTarget::Artifact => {
            write_artifact(PathBuf::from(session.artifact_name(&Local::now())), &result.output)?
        }
    };

    if config.clip {
        match copy_to_clipboard(&result.output) {
            Ok(provider) => log::info!("Copied artifact to clipboard with {}", provider),
            Err(e) => log::warn!("Failed to copy to clipboard: {}", e),
        }
    }

    if !config.quiet {
        Reporter::new().print_report(&PackReport {
            result: &result,
            destination,
            duration: start_time.elapsed(),
            excluded_count: session.excluded_count(),
        });
    }

    Ok(())
}

fn open_settings(config: &Config) -> Box<dyn SettingsStore> {
    match &config.settings_path {
        Some(path) => Box::new(JsonFileStore::open(path)),
        None => {
            log::warn!("No config directory found; settings will not persist");
            Box::new(MemoryStore::new())
        }
    }
}

fn write_artifact(path: PathBuf, output: &str) -> io::Result<String> {
    fs::write(&path, output)?;
    Ok(path.display().to_string())
}

fn print_tree(session: &Session, threshold: usize) {
    let tree = session.tree();
    let lines = tree.render_lines(session.engine());
    match tree.render_mode(threshold) {
        RenderMode::Full => {
            for line in lines {
                eprintln!("{}", line);
            }
        }
        RenderMode::Virtualized { total, chunk_size } => {
            for line in lines.take(chunk_size) {
                eprintln!("{}", line);
            }
            eprintln!(
                "... {} more entries ({} files, showing the first {})",
                total.saturating_sub(chunk_size),
                tree.file_count(),
                chunk_size
            );
        }
    }
}
