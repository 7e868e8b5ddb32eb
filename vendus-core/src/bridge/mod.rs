//! Host-side tasks callable from the browser workflow.
//!
//! The workflow only drives the page. Anything that touches the operator's
//! terminal, the filesystem or the network outside the page goes through a
//! named task registered here and is awaited before the next step runs.

mod download;
mod path;
mod status;

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub use download::{DownloadFileTask, DownloadRequest, HttpDownloader, SessionCookie};
pub use path::{parse_path, ParsePathTask, ParsedPath};
pub use status::{LogReporter, StatusReporter, StatusTask};

pub const STATUS: &str = "status";
pub const PARSE_PATH: &str = "parsePath";
pub const DOWNLOAD_FILE: &str = "downloadFile";

pub type BridgeResult<T> = Result<T, BridgeError>;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("unknown task: {0}")]
    UnknownTask(String),
    #[error("task {task} argument {index}: {message}")]
    Argument {
        task: &'static str,
        index: usize,
        message: String,
    },
    #[error("task {task} returned an unexpected value: {source}")]
    Decode {
        task: &'static str,
        source: serde_json::Error,
    },
    #[error("{url}: {message}")]
    Download { url: String, message: String },
}

#[async_trait]
pub trait Task: Send + Sync {
    fn name(&self) -> &'static str;
    async fn call(&self, args: Vec<Value>) -> BridgeResult<Value>;
}

#[derive(Clone, Default)]
pub struct TaskBridge {
    tasks: BTreeMap<&'static str, Arc<dyn Task>>,
}

impl fmt::Debug for TaskBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskBridge")
            .field("tasks", &self.tasks.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TaskBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// The three standard tasks.
    pub fn standard(reporter: Arc<dyn StatusReporter>, downloader: HttpDownloader) -> Self {
        Self::new()
            .with_task(StatusTask::new(reporter))
            .with_task(ParsePathTask)
            .with_task(DownloadFileTask::new(downloader))
    }

    pub fn with_task<T: Task + 'static>(mut self, task: T) -> Self {
        self.register(Arc::new(task));
        self
    }

    /// Registers `task`, replacing any task with the same name.
    pub fn register(&mut self, task: Arc<dyn Task>) {
        self.tasks.insert(task.name(), task);
    }

    pub fn has(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tasks.keys().copied().collect()
    }

    pub async fn invoke(&self, name: &str, args: Vec<Value>) -> BridgeResult<Value> {
        let task = self
            .tasks
            .get(name)
            .ok_or_else(|| BridgeError::UnknownTask(name.to_string()))?;
        debug!(task = name, args = args.len(), "invoking bridge task");
        task.call(args).await
    }

    pub async fn status(&self, message: impl Into<String>) -> BridgeResult<()> {
        self.invoke(STATUS, vec![Value::String(message.into())])
            .await
            .map(|_| ())
    }

    pub async fn parse_path(&self, path: &str) -> BridgeResult<ParsedPath> {
        let value = self
            .invoke(PARSE_PATH, vec![Value::String(path.to_string())])
            .await?;
        serde_json::from_value(value).map_err(|source| BridgeError::Decode {
            task: PARSE_PATH,
            source,
        })
    }

    pub async fn download_file(&self, request: &DownloadRequest) -> BridgeResult<PathBuf> {
        let value = self.invoke(DOWNLOAD_FILE, request.to_args()).await?;
        let path: String = serde_json::from_value(value).map_err(|source| BridgeError::Decode {
            task: DOWNLOAD_FILE,
            source,
        })?;
        Ok(PathBuf::from(path))
    }
}

pub(crate) fn string_arg(task: &'static str, args: &[Value], index: usize) -> BridgeResult<String> {
    match args.get(index) {
        Some(Value::String(value)) => Ok(value.clone()),
        Some(other) => Err(BridgeError::Argument {
            task,
            index,
            message: format!("expected a string, got {other}"),
        }),
        None => Err(BridgeError::Argument {
            task,
            index,
            message: "missing".to_string(),
        }),
    }
}
