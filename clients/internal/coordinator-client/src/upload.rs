// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Streaming multipart uploads
//!
//! A file is sent as a `multipart/form-data` body without ever being held
//! in memory as a whole. The small multipart preamble and trailer are
//! computed up front; a producer task then feeds preamble, file chunks and
//! trailer through a bounded channel whose receiving end is the request
//! body. The channel depth bounds memory use and makes a slow network push
//! back on file reads.

use std::io;
use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use reqwest::StatusCode;
use reqwest::header::{CONNECTION, CONTENT_TYPE, TRANSFER_ENCODING};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::client::{CoordinatorClient, http_method};
use crate::error::ClientError;
use crate::params::encode_pairs;
use crate::request::Request;
use crate::throttle::Throttle;

/// Chunks buffered between the file reader and the request body
pub const CONNECTOR_DEPTH: usize = 8;

/// How long a finished request waits for its producer to wind down
pub const PRODUCER_GRACE: Duration = Duration::from_secs(5);

/// Precomputed multipart framing around a single file part
#[derive(Debug, Clone)]
pub struct MultipartFrame {
    boundary: String,
    head: Bytes,
    tail: Bytes,
}

impl MultipartFrame {
    /// Frame a file part named `field` with the given extra string fields,
    /// which precede the file part
    pub fn new(field: &str, file_name: &str, fields: &[(String, String)]) -> Self {
        let boundary = format!(
            "{}{}",
            uuid::Uuid::new_v4().simple(),
            uuid::Uuid::new_v4().simple()
        );
        Self::with_boundary(boundary, field, file_name, fields)
    }

    pub fn with_boundary(
        boundary: String,
        field: &str,
        file_name: &str,
        fields: &[(String, String)],
    ) -> Self {
        let mut head = String::new();
        for (key, value) in fields {
            if !head.is_empty() {
                head.push_str("\r\n");
            }
            head.push_str(&format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}",
                boundary,
                escape_quotes(key),
                value
            ));
        }
        if !head.is_empty() {
            head.push_str("\r\n");
        }
        head.push_str(&format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n",
            boundary,
            escape_quotes(field),
            escape_quotes(file_name)
        ));

        let tail = format!("\r\n--{}--\r\n", boundary);

        Self {
            boundary,
            head: Bytes::from(head),
            tail: Bytes::from(tail),
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn head(&self) -> &[u8] {
        &self.head
    }

    pub fn tail(&self) -> &[u8] {
        &self.tail
    }
}

fn escape_quotes(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// How the producer side of a connector finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Produced {
    /// Everything was handed over; carries the number of file bytes
    Complete(u64),
    /// The body was dropped before the producer finished
    Abandoned,
}

/// Wire `source` into a multipart body stream.
///
/// Returns the body stream and the producer task. A read error on
/// `source` is forwarded into the stream, so the request fails instead of
/// sending a silently truncated body, and is also the producer's result.
pub fn connect<R>(
    frame: MultipartFrame,
    source: R,
    chunk_size: usize,
    rate_limit: Option<u64>,
) -> (BoxStream<'static, io::Result<Bytes>>, JoinHandle<io::Result<Produced>>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(CONNECTOR_DEPTH);
    let producer = tokio::spawn(produce(frame, source, chunk_size.max(1), tx));

    let throttle = rate_limit.filter(|r| *r > 0).map(Throttle::new);
    let body = futures_util::stream::unfold((rx, throttle), |(mut rx, mut throttle)| async move {
        let Some(item) = rx.recv().await else {
            return None;
        };
        if let (Ok(chunk), Some(throttle)) = (&item, throttle.as_mut()) {
            throttle.consume(chunk.len()).await;
        }
        Some((item, (rx, throttle)))
    });

    (body.boxed(), producer)
}

async fn produce<R>(
    frame: MultipartFrame,
    mut source: R,
    chunk_size: usize,
    tx: mpsc::Sender<io::Result<Bytes>>,
) -> io::Result<Produced>
where
    R: AsyncRead + Unpin,
{
    // The sender is dropped on every return path, which ends the body
    if tx.send(Ok(frame.head)).await.is_err() {
        return Ok(Produced::Abandoned);
    }

    let mut buf = vec![0u8; chunk_size];
    let mut total = 0u64;
    loop {
        let n = match source.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                let _ = tx.send(Err(io::Error::new(e.kind(), e.to_string()))).await;
                return Err(e);
            }
        };
        total += n as u64;
        if tx.send(Ok(Bytes::copy_from_slice(&buf[..n]))).await.is_err() {
            return Ok(Produced::Abandoned);
        }
    }

    if tx.send(Ok(frame.tail)).await.is_err() {
        return Ok(Produced::Abandoned);
    }
    Ok(Produced::Complete(total))
}

impl CoordinatorClient {
    /// Stream the file at `path` as the multipart field `field`.
    ///
    /// String options of `request` become extra form fields. A response
    /// other than 200 is an [`ClientError::Upload`]; nothing is retried
    /// here.
    pub async fn upload_large_file(
        &self,
        request: Request,
        field: &str,
        path: &Path,
    ) -> Result<(), ClientError> {
        self.upload_large_file_cancellable(request, field, path, &CancellationToken::new())
            .await
    }

    /// [`Self::upload_large_file`], aborted with [`ClientError::Cancelled`]
    /// when `cancel` fires
    pub async fn upload_large_file_cancellable(
        &self,
        request: Request,
        field: &str,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), ClientError> {
        let Request {
            route,
            interpolations,
            options,
            body,
        } = request;

        if body.is_some() {
            return Err(ClientError::Encoding(
                "an upload request's body is the file being uploaded".to_string(),
            ));
        }

        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| ClientError::io(path, e))?;
        let metadata = file.metadata().await.map_err(|e| ClientError::io(path, e))?;
        if !metadata.is_file() {
            return Err(ClientError::io(
                path,
                io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
            ));
        }
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                ClientError::io(path, io::Error::new(io::ErrorKind::InvalidInput, "no file name"))
            })?;

        let fields = encode_pairs(&options)?;
        let url = self.resolve_url(route, &interpolations)?;
        let frame = MultipartFrame::new(field, &file_name, &fields);
        let content_type = frame.content_type();

        if let Some(rate) = self.upload_rate_limit {
            tracing::info!(path = %path.display(), bytes_per_sec = rate, "Upload with bandwidth limit");
            self.note_rate_limit(rate).await;
        }
        tracing::debug!(
            path = %path.display(),
            size = metadata.len(),
            route = route.name,
            "Starting streamed upload"
        );

        let (body, producer) = connect(frame, file, self.upload_chunk_size, self.upload_rate_limit);

        let builder = self
            .upload_http
            .request(http_method(route.method), url)
            .version(reqwest::Version::HTTP_11)
            .header(CONTENT_TYPE, content_type)
            .header(TRANSFER_ENCODING, "chunked")
            .header(CONNECTION, "keep-alive")
            .body(reqwest::Body::wrap_stream(body));
        let builder = self.authorize(builder);

        let sent = tokio::select! {
            sent = builder.send() => sent,
            _ = cancel.cancelled() => {
                producer.abort();
                tracing::warn!(path = %path.display(), "Upload cancelled");
                return Err(ClientError::Cancelled);
            }
        };

        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                // A local read failure explains whatever the transport reported
                settle_producer(path, producer, cancel).await?;
                return Err(e.into());
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            // The server may have stopped reading the body
            producer.abort();
            tracing::warn!(path = %path.display(), status = %status, "Upload rejected");
            return Err(ClientError::Upload {
                path: path.to_path_buf(),
                status: status.as_u16(),
            });
        }

        settle_producer(path, producer, cancel).await?;
        let text = tokio::select! {
            text = response.text() => text.unwrap_or_default(),
            _ = cancel.cancelled() => return Err(ClientError::Cancelled),
        };
        tracing::debug!(path = %path.display(), status = %status, body = %text, "Upload response");
        Ok(())
    }

    /// Record the bandwidth limit in the active task's output
    async fn note_rate_limit(&self, rate: u64) {
        if self.doc_id().is_none_or(str::is_empty) {
            return;
        }
        let notice = format!("Upload with bandwidth limit of: {}", rate);
        if let Err(e) = self.append_task_output(&notice).await {
            tracing::warn!(error = %e, "Failed to record upload bandwidth limit");
        }
    }
}

/// Wait for the producer once the request is over.
///
/// The wait is bounded by [`PRODUCER_GRACE`] and by `cancel`, since a
/// producer blocked on a body nobody reads never finishes on its own.
async fn settle_producer(
    path: &Path,
    mut producer: JoinHandle<io::Result<Produced>>,
    cancel: &CancellationToken,
) -> Result<(), ClientError> {
    let joined = tokio::select! {
        joined = tokio::time::timeout(PRODUCER_GRACE, &mut producer) => Some(joined),
        _ = cancel.cancelled() => None,
    };
    let Some(joined) = joined else {
        producer.abort();
        tracing::warn!(path = %path.display(), "Upload cancelled");
        return Err(ClientError::Cancelled);
    };

    match joined {
        Ok(Ok(Ok(produced))) => {
            tracing::debug!(path = %path.display(), ?produced, "Upload producer finished");
            Ok(())
        }
        Ok(Ok(Err(e))) => {
            tracing::error!(path = %path.display(), error = %e, "Reading upload source failed");
            Err(ClientError::io(path, e))
        }
        Ok(Err(e)) => Err(ClientError::io(path, io::Error::other(e.to_string()))),
        Err(_) => {
            producer.abort();
            tracing::warn!(path = %path.display(), "Upload producer stalled, aborting");
            Ok(())
        }
    }
}
