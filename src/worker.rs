/*!
 * Text processing functions and a background worker around them
 *
 * The functions here are pure and can be called from any thread. The
 * [`TextWorker`] runs them on a dedicated thread behind a request/response
 * channel pair so the control thread never blocks on large batches.
 */

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use rayon::prelude::*;

use crate::error::{PackError, Result};
use crate::pattern::parse_gitignore;
use crate::tokenizer::estimate_tokens;
use crate::utils::{count_lines, is_text_file};

/// Line, character and estimated token counts of one text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextStats {
    pub lines: usize,
    pub chars: usize,
    pub tokens: usize,
}

/// Statistics for one file of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStats {
    pub path: String,
    pub stats: TextStats,
}

/// One file handed to batch processing
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub path: String,
    pub name: String,
    pub content: Arc<str>,
}

/// Count lines, characters and estimated tokens
pub fn process_content(content: &str) -> TextStats {
    TextStats {
        lines: count_lines(content),
        chars: content.chars().count(),
        tokens: estimate_tokens(content),
    }
}

/// Process every text file of a batch, keeping input order
pub fn process_batch(items: &[BatchItem]) -> Vec<FileStats> {
    items
        .par_iter()
        .filter(|item| is_text_file(&item.name))
        .map(|item| FileStats {
            path: item.path.clone(),
            stats: process_content(&item.content),
        })
        .collect()
}

/// Work accepted by the worker thread
#[derive(Debug, Clone)]
pub enum WorkerRequest {
    EstimateTokens { text: Arc<str> },
    ProcessFile { file_id: String, content: Arc<str> },
    ParseGitignore { content: String },
    BatchProcess { items: Vec<BatchItem> },
}

/// Result sent back for each request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerResponse {
    TokensEstimated(usize),
    FileProcessed { file_id: String, stats: TextStats },
    GitignoreParsed(Vec<String>),
    BatchProcessed(Vec<FileStats>),
}

/// Serve one request
pub fn handle_request(request: WorkerRequest) -> WorkerResponse {
    match request {
        WorkerRequest::EstimateTokens { text } => {
            WorkerResponse::TokensEstimated(estimate_tokens(&text))
        }
        WorkerRequest::ProcessFile { file_id, content } => WorkerResponse::FileProcessed {
            file_id,
            stats: process_content(&content),
        },
        WorkerRequest::ParseGitignore { content } => {
            WorkerResponse::GitignoreParsed(parse_gitignore(&content))
        }
        WorkerRequest::BatchProcess { items } => {
            WorkerResponse::BatchProcessed(process_batch(&items))
        }
    }
}

/// Background thread serving [`WorkerRequest`]s one at a time
pub struct TextWorker {
    requests: Option<Sender<WorkerRequest>>,
    responses: Receiver<WorkerResponse>,
    handle: Option<JoinHandle<()>>,
}

impl TextWorker {
    /// Start the worker thread
    pub fn spawn() -> Result<Self> {
        let (request_tx, request_rx) = mpsc::channel::<WorkerRequest>();
        let (response_tx, response_rx) = mpsc::channel::<WorkerResponse>();

        let handle = thread::Builder::new()
            .name("codepack-worker".to_string())
            .spawn(move || {
                for request in request_rx {
                    if response_tx.send(handle_request(request)).is_err() {
                        break;
                    }
                }
                log::trace!("Worker thread exiting");
            })?;

        Ok(Self {
            requests: Some(request_tx),
            responses: response_rx,
            handle: Some(handle),
        })
    }

    /// Send a request and wait for its response
    pub fn request(&self, request: WorkerRequest) -> Result<WorkerResponse> {
        let sender = self
            .requests
            .as_ref()
            .ok_or_else(|| PackError::Worker("worker is shut down".to_string()))?;
        sender
            .send(request)
            .map_err(|_| PackError::Worker("worker thread stopped".to_string()))?;
        self.responses
            .recv()
            .map_err(|_| PackError::Worker("worker thread stopped".to_string()))
    }

    pub fn estimate_tokens(&self, text: Arc<str>) -> Result<usize> {
        match self.request(WorkerRequest::EstimateTokens { text })? {
            WorkerResponse::TokensEstimated(tokens) => Ok(tokens),
            other => Err(unexpected(&other)),
        }
    }

    pub fn process_file(&self, file_id: &str, content: Arc<str>) -> Result<TextStats> {
        let request = WorkerRequest::ProcessFile {
            file_id: file_id.to_string(),
            content,
        };
        match self.request(request)? {
            WorkerResponse::FileProcessed { stats, .. } => Ok(stats),
            other => Err(unexpected(&other)),
        }
    }

    pub fn parse_gitignore(&self, content: String) -> Result<Vec<String>> {
        match self.request(WorkerRequest::ParseGitignore { content })? {
            WorkerResponse::GitignoreParsed(patterns) => Ok(patterns),
            other => Err(unexpected(&other)),
        }
    }

    pub fn process_batch(&self, items: Vec<BatchItem>) -> Result<Vec<FileStats>> {
        match self.request(WorkerRequest::BatchProcess { items })? {
            WorkerResponse::BatchProcessed(stats) => Ok(stats),
            other => Err(unexpected(&other)),
        }
    }
}

impl Drop for TextWorker {
    fn drop(&mut self) {
        // Closing the channel ends the thread's receive loop
        self.requests.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("Worker thread panicked");
            }
        }
    }
}

fn unexpected(response: &WorkerResponse) -> PackError {
    PackError::Worker(format!("unexpected response: {:?}", response))
}
