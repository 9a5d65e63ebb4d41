use std::{
    io::SeekFrom,
    path::{Path, PathBuf},
};

use bytes::Bytes;
use reqwest::{
    multipart::{Form, Part},
    Client, StatusCode,
};
use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::{error::UploadError, utils::format_bytes};

/// Bytes sent per request.
pub const CHUNK_SIZE: u64 = 5 * 1024 * 1024;
pub const UPLOAD_URL: &str = "https://api.monarchupload.cc/v3/upload";

const DEFAULT_FINISH_MESSAGE: &str = "Upload finished.";

/// One multipart POST worth of data.
#[derive(Debug, Clone)]
pub struct ChunkRequest {
    pub index: u64,
    /// Base name of the source file, sent as the part's filename.
    pub filename: String,
    pub data: Vec<u8>,
    pub secret: String,
    pub last_chunk: bool,
}

impl ChunkRequest {
    /// The text fields that accompany the `file` part.
    pub fn text_fields(&self) -> [(&'static str, String); 4] {
        [
            ("secret", self.secret.clone()),
            ("chunked", "true".to_string()),
            ("private", "false".to_string()),
            ("lastchunk", self.last_chunk.to_string()),
        ]
    }

    pub fn into_form(self) -> Form {
        let fields = self.text_fields();
        let part = Part::bytes(self.data).file_name(self.filename);
        fields
            .into_iter()
            .fold(Form::new().part("file", part), |form, (name, value)| {
                form.text(name, value)
            })
    }
}

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

/// Delivers chunk requests to the upload service.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ChunkRequest) -> Result<TransportResponse, UploadError>;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ChunkRequest) -> Result<TransportResponse, UploadError> {
        let request_index = request.index;
        let response = self
            .client
            .post(&self.endpoint)
            .multipart(request.into_form())
            .send()
            .await?;
        let status = response.status();
        tracing::trace!(chunk = request_index, %status, "chunk answered");
        let body = response.bytes().await?;
        Ok(TransportResponse { status, body })
    }
}

/// `status` and `message` are whatever JSON the service sent; anything but the string
/// `"success"` counts as a rejection.
#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    pub status: Option<Value>,
    pub message: Option<Value>,
    pub data: Option<ResponseData>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseData {
    pub url: Option<String>,
}

impl UploadResponse {
    fn is_success(&self) -> bool {
        matches!(&self.status, Some(Value::String(status)) if status == "success")
    }

    fn status_text(&self) -> Option<String> {
        self.status.as_ref().map(value_text)
    }

    fn message_text(&self) -> Option<String> {
        self.message
            .as_ref()
            .filter(|message| !message.is_null())
            .map(value_text)
    }

    fn url(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|data| data.url.as_deref())
            .filter(|url| !url.is_empty())
    }
}

/// How an upload ended. Failures the user is told about are outcomes, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The file was gone by the time the upload started.
    MissingFile(PathBuf),
    /// The service answered a chunk with something other than 200.
    HttpStatus { chunk: u64, status: StatusCode },
    /// The service acknowledged the last chunk.
    Finished {
        chunks: u64,
        message: String,
        url: Option<String>,
    },
    /// The service answered with a status other than `success`.
    Rejected {
        chunk: u64,
        status: Option<String>,
        message: String,
        url: Option<String>,
    },
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UploadOutcome::Finished { .. })
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            UploadOutcome::Finished { url, .. } | UploadOutcome::Rejected { url, .. } => {
                url.as_deref()
            }
            _ => None,
        }
    }
}

pub struct Uploader<'a, T: Transport + ?Sized> {
    transport: &'a T,
    secret: &'a str,
    chunk_size: u64,
}

impl<'a, T: Transport + ?Sized> Uploader<'a, T> {
    pub fn new(transport: &'a T, secret: &'a str) -> Self {
        Self {
            transport,
            secret,
            chunk_size: CHUNK_SIZE,
        }
    }

    #[cfg(test)]
    fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Send `path` chunk by chunk until the service reports completion, rejects a chunk or the
    /// last chunk went out.
    ///
    /// A file whose size is an exact multiple of the chunk size ends with an empty last chunk.
    pub async fn upload<P: AsRef<Path>>(&self, path: P) -> Result<UploadOutcome, UploadError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::error!("File does not exist: {}", path.display());
            return Ok(UploadOutcome::MissingFile(path.to_path_buf()));
        }

        tracing::info!("Uploading file: {}", path.display());

        let read_err = |source| UploadError::Read {
            path: path.to_path_buf(),
            source,
        };
        let mut file = tokio::fs::File::open(path).await.map_err(read_err)?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut index: u64 = 0;
        loop {
            let data = read_chunk(&mut file, index, self.chunk_size)
                .await
                .map_err(read_err)?;
            let last_chunk = (data.len() as u64) < self.chunk_size;
            tracing::debug!(
                chunk = index,
                size = %format_bytes(data.len() as u64),
                last_chunk,
                "sending chunk"
            );

            let request = ChunkRequest {
                index,
                filename: filename.clone(),
                data,
                secret: self.secret.to_string(),
                last_chunk,
            };
            let response = self.transport.send(request).await?;

            if response.status != StatusCode::OK {
                tracing::error!("Failed to upload. HTTP {}", response.status.as_u16());
                return Ok(UploadOutcome::HttpStatus {
                    chunk: index,
                    status: response.status,
                });
            }

            let body: UploadResponse = serde_json::from_slice(&response.body)?;
            if !body.is_success() || last_chunk {
                let message = body
                    .message_text()
                    .unwrap_or_else(|| DEFAULT_FINISH_MESSAGE.to_string());
                tracing::info!("{}", message);
                let url = body.url().map(str::to_string);
                if let Some(url) = &url {
                    tracing::info!("Uploaded file URL: {}", url);
                }

                return Ok(if body.is_success() {
                    UploadOutcome::Finished {
                        chunks: index + 1,
                        message,
                        url,
                    }
                } else {
                    UploadOutcome::Rejected {
                        chunk: index,
                        status: body.status_text(),
                        message,
                        url,
                    }
                });
            }

            index += 1;
        }
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Read the `index`-th chunk. Short only at end of file.
async fn read_chunk(
    file: &mut tokio::fs::File,
    index: u64,
    chunk_size: u64,
) -> std::io::Result<Vec<u8>> {
    file.seek(SeekFrom::Start(index * chunk_size)).await?;
    let mut buf = Vec::with_capacity(chunk_size as usize);
    file.take(chunk_size).read_to_end(&mut buf).await?;
    Ok(buf)
}
