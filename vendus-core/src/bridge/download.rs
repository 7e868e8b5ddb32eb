use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{COOKIE, USER_AGENT};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

use super::{string_arg, BridgeError, BridgeResult, Task, DOWNLOAD_FILE};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
}

/// Arguments of `downloadFile`: `url`, `directory`, `filename`, then an
/// optional object carrying the browser session (`cookies`, `userAgent`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub directory: String,
    pub filename: String,
    pub cookies: Vec<SessionCookie>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SessionOptions {
    cookies: Vec<SessionCookie>,
    user_agent: Option<String>,
}

impl DownloadRequest {
    pub fn new(
        url: impl Into<String>,
        directory: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            directory: directory.into(),
            filename: filename.into(),
            cookies: Vec::new(),
            user_agent: None,
        }
    }

    pub fn with_session(mut self, cookies: Vec<SessionCookie>, user_agent: Option<String>) -> Self {
        self.cookies = cookies;
        self.user_agent = user_agent;
        self
    }

    pub fn to_args(&self) -> Vec<Value> {
        vec![
            Value::String(self.url.clone()),
            Value::String(self.directory.clone()),
            Value::String(self.filename.clone()),
            json!({ "cookies": self.cookies, "userAgent": self.user_agent }),
        ]
    }

    pub fn from_args(args: &[Value]) -> BridgeResult<Self> {
        let url = string_arg(DOWNLOAD_FILE, args, 0)?;
        let directory = string_arg(DOWNLOAD_FILE, args, 1)?;
        let filename = string_arg(DOWNLOAD_FILE, args, 2)?;
        let options = match args.get(3) {
            None | Some(Value::Null) => SessionOptions::default(),
            Some(value) => serde_json::from_value(value.clone()).map_err(|err| {
                BridgeError::Argument {
                    task: DOWNLOAD_FILE,
                    index: 3,
                    message: err.to_string(),
                }
            })?,
        };
        Ok(Self {
            url,
            directory,
            filename,
            cookies: options.cookies,
            user_agent: options.user_agent,
        })
    }

    pub fn destination(&self) -> PathBuf {
        let directory = if self.directory.is_empty() {
            Path::new(".")
        } else {
            Path::new(&self.directory)
        };
        directory.join(&self.filename)
    }

    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|cookie| format!("{}={}", cookie.name, cookie.value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// Fetches a URL with the browser session attached and streams it to disk.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    pub fn new() -> BridgeResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| BridgeError::Download {
                url: String::new(),
                message: format!("failed to build http client: {err}"),
            })?;
        Ok(Self { client })
    }

    pub async fn fetch(&self, request: &DownloadRequest) -> BridgeResult<PathBuf> {
        let fail = |message: String| BridgeError::Download {
            url: request.url.clone(),
            message,
        };
        // The link comes from the remote page; only network fetches are allowed.
        let url = Url::parse(&request.url).map_err(|err| fail(err.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(fail(format!("unsupported scheme {}", url.scheme())));
        }

        let destination = request.destination();
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|err| fail(format!("cannot create {}: {err}", parent.display())))?;
        }

        let mut builder = self.client.get(url);
        if let Some(cookies) = request.cookie_header() {
            builder = builder.header(COOKIE, cookies);
        }
        if let Some(agent) = &request.user_agent {
            builder = builder.header(USER_AGENT, agent.as_str());
        }
        let response = builder
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| fail(err.to_string()))?;

        let mut file = fs::File::create(&destination)
            .await
            .map_err(|err| fail(format!("cannot create {}: {err}", destination.display())))?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let data = chunk.map_err(|err| fail(err.to_string()))?;
            file.write_all(&data)
                .await
                .map_err(|err| fail(format!("cannot write {}: {err}", destination.display())))?;
            written += data.len() as u64;
        }
        file.flush()
            .await
            .map_err(|err| fail(format!("cannot write {}: {err}", destination.display())))?;
        debug!(bytes = written, "download stream finished");
        info!(path = %destination.display(), bytes = written, "download saved");
        Ok(destination)
    }
}

pub struct DownloadFileTask {
    downloader: HttpDownloader,
}

impl DownloadFileTask {
    pub fn new(downloader: HttpDownloader) -> Self {
        Self { downloader }
    }
}

#[async_trait]
impl Task for DownloadFileTask {
    fn name(&self) -> &'static str {
        DOWNLOAD_FILE
    }

    async fn call(&self, args: Vec<Value>) -> BridgeResult<Value> {
        let request = DownloadRequest::from_args(&args)?;
        let path = self.downloader.fetch(&request).await?;
        Ok(Value::String(path.to_string_lossy().into_owned()))
    }
}
