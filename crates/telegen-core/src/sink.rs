//! Output sinks: append-to-file, stdout debug printer and HTTP POST

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use flate2::write::GzEncoder;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_ENCODING, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::accumulator::Batch;
use crate::config::parse_duration;
use crate::error::SinkError;
use crate::export::Sink;

/// Response bodies longer than this are cut in error messages
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    None,
    Gzip,
}

/// Compress one batch as a standalone gzip member
fn gzip(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(
        Vec::with_capacity(data.len() / 4),
        flate2::Compression::default(),
    );
    encoder.write_all(data)?;
    encoder.finish()
}

fn encode(data: &[u8], compression: Compression) -> io::Result<Cow<'_, [u8]>> {
    match compression {
        Compression::None => Ok(Cow::Borrowed(data)),
        Compression::Gzip => gzip(data).map(Cow::Owned),
    }
}

/// Which sink `output.type` selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    File,
    Debug,
    Http,
}

impl SinkKind {
    pub const ALL: [SinkKind; 3] = [Self::File, Self::Debug, Self::Http];

    pub fn name(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Debug => "debug",
            Self::Http => "http",
        }
    }

    /// Case-insensitive lookup; `stdout` is accepted for `debug`
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "file" => Some(Self::File),
            "debug" | "stdout" => Some(Self::Debug),
            "http" => Some(Self::Http),
            _ => None,
        }
    }
}

impl std::fmt::Display for SinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// === File ===

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSinkConfig {
    pub path: PathBuf,
    pub compression: Compression,
}

impl Default for FileSinkConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./telegen-output.ndjson"),
            compression: Compression::None,
        }
    }
}

/// Appends every batch to one file.
///
/// The file and its parent directories are created on the first send. With
/// gzip each batch becomes its own member, so the file stays a valid gzip
/// stream however the run ends.
pub struct FileSink {
    path: PathBuf,
    compression: Compression,
    file: Option<tokio::fs::File>,
    bytes_written: u64,
}

impl std::fmt::Debug for FileSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSink")
            .field("path", &self.path)
            .field("compression", &self.compression)
            .field("bytes_written", &self.bytes_written)
            .finish_non_exhaustive()
    }
}

impl FileSink {
    pub fn new(config: &FileSinkConfig) -> Self {
        Self {
            path: config.path.clone(),
            compression: config.compression,
            file: None,
            bytes_written: 0,
        }
    }

    /// Bytes written to disk, after compression
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    async fn open(&mut self) -> Result<&mut tokio::fs::File, SinkError> {
        if self.file.is_none() {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            let file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await?;
            log::debug!("Opened {} for append", self.path.display());
            self.file = Some(file);
        }
        self.file.as_mut().ok_or(SinkError::Closed)
    }
}

impl Sink for FileSink {
    async fn send(&mut self, batch: &Batch) -> Result<(), SinkError> {
        let data = encode(batch.as_bytes(), self.compression)?;
        let file = self.open().await?;
        file.write_all(&data).await?;
        file.flush().await?;
        self.bytes_written += data.len() as u64;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        if let Some(file) = self.file.take() {
            file.sync_all().await?;
        }
        Ok(())
    }

    fn wait_for_completion(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

// === Debug ===

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// One line per batch with its size
    Basic,
    /// Every record line, prefixed
    #[default]
    Normal,
    /// Framed block with size, line count and numbered lines
    Detailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugSinkConfig {
    pub verbosity: Verbosity,
    pub prefix: String,
    pub show_timestamp: bool,
}

impl Default for DebugSinkConfig {
    fn default() -> Self {
        Self {
            verbosity: Verbosity::Normal,
            prefix: "[DEBUG]".to_string(),
            show_timestamp: false,
        }
    }
}

/// Prints batches in human-readable form, by default to stdout.
pub struct DebugSink {
    config: DebugSinkConfig,
    out: Box<dyn Write + Send>,
}

impl std::fmt::Debug for DebugSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugSink")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DebugSink {
    pub fn new(config: &DebugSinkConfig) -> Self {
        Self::with_writer(config, Box::new(io::stdout()))
    }

    pub fn with_writer(config: &DebugSinkConfig, out: Box<dyn Write + Send>) -> Self {
        Self {
            config: config.clone(),
            out,
        }
    }

    fn lead(&self) -> Cow<'_, str> {
        if self.config.show_timestamp {
            let now = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ");
            Cow::Owned(format!("{now} {}", self.config.prefix))
        } else {
            Cow::Borrowed(&self.config.prefix)
        }
    }

    fn render(&self, batch: &Batch) -> String {
        let lead = self.lead();
        let text = String::from_utf8_lossy(batch.as_bytes());
        let lines: Vec<&str> = text.trim().split('\n').collect();
        let mut out = String::with_capacity(batch.len() + lines.len() * (lead.len() + 8));

        match self.config.verbosity {
            Verbosity::Basic => {
                out.push_str(&format!("{lead} Data received ({} bytes)\n", batch.len()));
            }
            Verbosity::Normal => {
                for line in lines.iter().filter(|l| !l.is_empty()) {
                    out.push_str(&format!("{lead} {line}\n"));
                }
            }
            Verbosity::Detailed => {
                let rule = "=".repeat(40);
                out.push_str(&format!("{lead} {rule}\n"));
                out.push_str(&format!("{lead} Data Size: {} bytes\n", batch.len()));
                out.push_str(&format!("{lead} Number of Lines: {}\n", lines.len()));
                out.push_str(&format!("{lead} {}\n", "-".repeat(40)));
                for (i, line) in lines.iter().enumerate() {
                    if !line.is_empty() {
                        out.push_str(&format!("{lead} [{}] {line}\n", i + 1));
                    }
                }
                out.push_str(&format!("{lead} {rule}\n"));
            }
        }
        out
    }
}

impl Sink for DebugSink {
    async fn send(&mut self, batch: &Batch) -> Result<(), SinkError> {
        let rendered = self.render(batch);
        self.out.write_all(rendered.as_bytes())?;
        self.out.flush()?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "debug"
    }
}

// === HTTP ===

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSinkConfig {
    pub url: String,
    /// Extra request headers
    pub headers: BTreeMap<String, String>,
    pub compression: Compression,
    /// Per-request timeout; "0" disables
    pub timeout: String,
    /// Sent as `Authorization: Bearer <token>`
    pub token: Option<String>,
}

impl Default for HttpSinkConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080/ingest".to_string(),
            headers: BTreeMap::new(),
            compression: Compression::Gzip,
            timeout: "30s".to_string(),
            token: None,
        }
    }
}

/// POSTs each batch as one request body.
pub struct HttpSink {
    client: reqwest::Client,
    url: String,
    headers: HeaderMap,
    compression: Compression,
    token: Option<String>,
}

impl std::fmt::Debug for HttpSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSink")
            .field("url", &self.url)
            .field("compression", &self.compression)
            .field("has_token", &self.token.is_some())
            .finish_non_exhaustive()
    }
}

impl HttpSink {
    pub fn new(config: &HttpSinkConfig) -> Result<Self, SinkError> {
        if config.url.trim().is_empty() {
            return Err(SinkError::InvalidConfig("http url is empty".to_string()));
        }
        let timeout = parse_duration(&config.timeout).map_err(|e| {
            SinkError::InvalidConfig(format!("http timeout {:?}: {e}", config.timeout))
        })?;

        let mut builder = reqwest::Client::builder().connect_timeout(Duration::from_secs(10));
        if !timeout.is_zero() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| SinkError::InvalidConfig(format!("http client: {e}")))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            headers: build_headers(&config.headers)?,
            compression: config.compression,
            token: config.token.clone().filter(|t| !t.is_empty()),
        })
    }
}

/// Configured headers plus an NDJSON content type unless one was given
fn build_headers(extra: &BTreeMap<String, String>) -> Result<HeaderMap, SinkError> {
    let mut headers = HeaderMap::with_capacity(extra.len() + 1);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/x-ndjson"));
    for (name, value) in extra {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| SinkError::InvalidConfig(format!("header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| SinkError::InvalidConfig(format!("header {name}: {e}")))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

fn truncate_body(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
        body.push_str("...");
    }
    body
}

impl Sink for HttpSink {
    async fn send(&mut self, batch: &Batch) -> Result<(), SinkError> {
        let body = encode(batch.as_bytes(), self.compression)?.into_owned();

        let mut request = self
            .client
            .post(&self.url)
            .headers(self.headers.clone())
            .body(body);
        if self.compression == Compression::Gzip {
            request = request.header(CONTENT_ENCODING, "gzip");
        }
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| SinkError::from_reqwest(&e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Http {
                status: Some(status.as_u16()),
                message: truncate_body(body),
            });
        }
        Ok(())
    }

    fn wait_for_completion(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

// === Dispatch ===

/// Per-sink settings, one table each under `[output]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkSettings {
    pub file: FileSinkConfig,
    pub debug: DebugSinkConfig,
    pub http: HttpSinkConfig,
}

/// Any configured sink, for callers that pick one at runtime
#[derive(Debug)]
pub enum AnySink {
    File(FileSink),
    Debug(DebugSink),
    Http(HttpSink),
}

impl AnySink {
    pub fn build(kind: SinkKind, settings: &SinkSettings) -> Result<Self, SinkError> {
        Ok(match kind {
            SinkKind::File => Self::File(FileSink::new(&settings.file)),
            SinkKind::Debug => Self::Debug(DebugSink::new(&settings.debug)),
            SinkKind::Http => Self::Http(HttpSink::new(&settings.http)?),
        })
    }
}

impl Sink for AnySink {
    async fn send(&mut self, batch: &Batch) -> Result<(), SinkError> {
        match self {
            Self::File(s) => s.send(batch).await,
            Self::Debug(s) => s.send(batch).await,
            Self::Http(s) => s.send(batch).await,
        }
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        match self {
            Self::File(s) => s.close().await,
            Self::Debug(s) => s.close().await,
            Self::Http(s) => s.close().await,
        }
    }

    fn wait_for_completion(&self) -> bool {
        match self {
            Self::File(s) => s.wait_for_completion(),
            Self::Debug(s) => s.wait_for_completion(),
            Self::Http(s) => s.wait_for_completion(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::File(s) => s.name(),
            Self::Debug(s) => s.name(),
            Self::Http(s) => s.name(),
        }
    }
}
