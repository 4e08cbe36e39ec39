use crate::client::{create_upload_client, Config};
use crate::error::{Result, UploadError};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use std::io::{Cursor, Read};
use std::sync::Arc;
use url::Url;

/// Transfer progress callback, called with (bytes sent, total bytes) of
/// the file part
pub type TransferProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// A multipart POST ready to be sent
#[derive(Debug, Clone)]
pub struct MultipartRequest {
    /// Upload endpoint
    pub url: Url,
    /// Form parts, in transmission order
    pub parts: Vec<MultipartPart>,
}

/// A part of a multipart form.
#[derive(Debug, Clone, PartialEq)]
pub enum MultipartPart {
    /// Text field.
    Text { name: String, value: String },
    /// File field.
    File {
        name: String,
        filename: String,
        content_type: String,
        data: Vec<u8>,
    },
}

impl MultipartRequest {
    /// Find the value of a text field
    pub fn text(&self, name: &str) -> Option<&str> {
        self.parts.iter().find_map(|part| match part {
            MultipartPart::Text { name: n, value } if n == name => Some(value.as_str()),
            _ => None,
        })
    }

    /// Find the file part
    pub fn file(&self) -> Option<&MultipartPart> {
        self.parts
            .iter()
            .find(|part| matches!(part, MultipartPart::File { .. }))
    }
}

/// Raw HTTP reply
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Capability to send one multipart request. Implementations make exactly
/// one attempt and report file part progress through `progress`.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync {
    fn send_multipart(
        &self,
        request: MultipartRequest,
        progress: TransferProgressFn,
    ) -> Result<HttpReply>;
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with a client configured from `config`
    pub fn new(config: &Config) -> Result<Self> {
        Ok(HttpTransport {
            client: create_upload_client(config)?,
        })
    }

    /// Wrap an existing client
    pub fn with_client(client: Client) -> Self {
        HttpTransport { client }
    }
}

impl Transport for HttpTransport {
    fn send_multipart(
        &self,
        request: MultipartRequest,
        progress: TransferProgressFn,
    ) -> Result<HttpReply> {
        let mut form = Form::new();

        for part in request.parts {
            form = match part {
                MultipartPart::Text { name, value } => form.text(name, value),
                MultipartPart::File {
                    name,
                    filename,
                    content_type,
                    data,
                } => {
                    let total = data.len() as u64;
                    let reader = ProgressReader {
                        inner: Cursor::new(data),
                        sent: 0,
                        total,
                        progress: Arc::clone(&progress),
                    };
                    let part = Part::reader_with_length(reader, total)
                        .file_name(filename)
                        .mime_str(&content_type)
                        .map_err(|e| {
                            UploadError::RequestBuild(format!(
                                "invalid content type {}: {}",
                                content_type, e
                            ))
                        })?;
                    form.part(name, part)
                }
            };
        }

        let response = self.client.post(request.url).multipart(form).send()?;
        let status = response.status().as_u16();
        let body = response.bytes()?.to_vec();

        Ok(HttpReply { status, body })
    }
}

/// Reader reporting cumulative bytes handed to the HTTP stack
struct ProgressReader<R> {
    inner: R,
    sent: u64,
    total: u64,
    progress: TransferProgressFn,
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.sent += n as u64;
            (self.progress)(self.sent, self.total);
        }
        Ok(n)
    }
}
