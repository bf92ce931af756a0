/*!
 * Clipboard support for codepack
 *
 * Copies the packed artifact through whichever clipboard command the
 * platform offers. Failures are reported to the caller, who treats them as
 * a warning.
 */

use std::env;
use std::io::{self, Write};
use std::path::Path;
use std::process::{Command, Stdio};

use once_cell::sync::Lazy;
use thiserror::Error;

/// Error type for clipboard operations
#[derive(Error, Debug)]
pub enum ClipboardError {
    /// Failed to execute the command
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// No suitable clipboard mechanism was found
    #[error("No suitable clipboard mechanism found")]
    NoClipboardFound,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for clipboard operations
pub type Result<T> = std::result::Result<T, ClipboardError>;

/// Something that can receive text
pub trait Clipboard {
    /// Short name for log and status messages
    fn name(&self) -> &str;

    /// Copy text to the clipboard
    fn copy_to_clipboard(&self, text: &str) -> Result<()>;
}

/// Clipboard commands, in no particular order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardProvider {
    Tmux,
    Wayland,
    Xsel,
    Xclip,
    MacOS,
    Windows,
    Termux,
}

impl ClipboardProvider {
    fn command(&self) -> (&'static str, &'static [&'static str]) {
        match self {
            Self::Tmux => ("tmux", &["load-buffer", "-w", "-"]),
            Self::Wayland => ("wl-copy", &[]),
            Self::Xsel => ("xsel", &["-b", "-i"]),
            Self::Xclip => ("xclip", &["-selection", "clipboard", "-in"]),
            Self::MacOS => ("pbcopy", &[]),
            Self::Windows => ("clip.exe", &[]),
            Self::Termux => ("termux-clipboard-set", &[]),
        }
    }
}

impl Clipboard for ClipboardProvider {
    fn name(&self) -> &str {
        self.command().0
    }

    fn copy_to_clipboard(&self, text: &str) -> Result<()> {
        let (cmd, args) = self.command();
        let mut child = Command::new(cmd)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ClipboardError::CommandFailed(format!("Failed to spawn {}: {}", cmd, e)))?;

        child
            .stdin
            .take()
            .ok_or_else(|| ClipboardError::CommandFailed(format!("No stdin for {}", cmd)))?
            .write_all(text.as_bytes())?;

        let status = child.wait()?;
        if status.success() {
            Ok(())
        } else {
            Err(ClipboardError::CommandFailed(format!(
                "{} exited with status: {}",
                cmd, status
            )))
        }
    }
}

/// Copy text with the first provider that succeeds and return its name
pub fn copy_to_clipboard(text: &str) -> Result<String> {
    let providers = detect_providers();
    let clipboards: Vec<&dyn Clipboard> = providers.iter().map(|p| p as &dyn Clipboard).collect();
    copy_with(&clipboards, text)
}

/// Try each clipboard in order until one accepts the text
pub fn copy_with(clipboards: &[&dyn Clipboard], text: &str) -> Result<String> {
    for clipboard in clipboards {
        match clipboard.copy_to_clipboard(text) {
            Ok(()) => {
                log::debug!("Copied {} bytes with {}", text.len(), clipboard.name());
                return Ok(clipboard.name().to_string());
            }
            Err(e) => log::debug!("Clipboard {} failed: {}", clipboard.name(), e),
        }
    }
    Err(ClipboardError::NoClipboardFound)
}

/// Check if a command exists in `PATH`
pub fn command_exists(command: &str) -> bool {
    env::var_os("PATH")
        .map(|paths| env::split_paths(&paths).any(|dir| Path::new(&dir).join(command).is_file()))
        .unwrap_or(false)
}

static PLATFORM: Lazy<&'static str> = Lazy::new(|| {
    if cfg!(target_os = "macos") {
        "macos"
    } else if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "android") {
        "android"
    } else if cfg!(target_os = "linux") {
        if env::var("WSL_DISTRO_NAME").is_ok() {
            "wsl"
        } else {
            "linux"
        }
    } else {
        "unknown"
    }
});

/// Available providers in order of preference; tmux first when inside a session
pub fn detect_providers() -> Vec<ClipboardProvider> {
    let mut candidates = Vec::new();
    if env::var("TMUX").is_ok() {
        candidates.push(ClipboardProvider::Tmux);
    }
    match *PLATFORM {
        "macos" => candidates.push(ClipboardProvider::MacOS),
        "windows" | "wsl" => candidates.push(ClipboardProvider::Windows),
        "linux" => candidates.extend([
            ClipboardProvider::Wayland,
            ClipboardProvider::Xsel,
            ClipboardProvider::Xclip,
        ]),
        "android" => candidates.push(ClipboardProvider::Termux),
        _ => {}
    }
    candidates
        .into_iter()
        .filter(|p| command_exists(p.command().0))
        .collect()
}
