// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 valise.dev

//! Asynchronous serialization and file surface (feature `async`).
//!
//! CPU-bound codec work dispatches to the runtime's blocking worker pool;
//! file I/O streams in 64 KiB chunks with an optional
//! `progress(bytes_done, bytes_total)` callback between chunks.
//!
//! Cancellation: dropping a returned future before it resumes abandons the
//! operation; a `spawn_blocking` body that already started runs to
//! completion on the worker, but its result is discarded.

use crate::container::Container;
use crate::error::{ErrorCode, ErrorInfo, Result, VoidResult};
use std::path::Path;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

const MODULE: &str = "aio";

/// Chunk size for file reads/writes and the default emission granularity.
pub const IO_CHUNK_SIZE: usize = 64 * 1024;

/// Progress callback: `(bytes_done, bytes_total)`.
pub type ProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

fn worker_err(err: tokio::task::JoinError) -> ErrorInfo {
    ErrorInfo::with_details(ErrorCode::IoError, MODULE, format!("worker task failed: {err}"))
}

/// Serialize to the canonical binary form on the worker pool.
pub async fn serialize_async(container: Arc<Container>) -> Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || container.to_bytes())
        .await
        .map_err(worker_err)?
}

/// Serialize to JSON text on the worker pool.
pub async fn serialize_string_async(container: Arc<Container>) -> Result<String> {
    tokio::task::spawn_blocking(move || container.to_json())
        .await
        .map_err(worker_err)?
}

/// Parse any supported format on the worker pool (format auto-detected).
pub async fn deserialize_async(bytes: Vec<u8>) -> Result<Container> {
    tokio::task::spawn_blocking(move || Container::deserialize_auto(&bytes))
        .await
        .map_err(worker_err)?
}

/// Write the canonical binary form to `path` in chunks.
pub async fn save_async(
    container: &Container,
    path: impl AsRef<Path>,
    progress: Option<ProgressFn>,
) -> VoidResult {
    let bytes = container.to_bytes()?;
    let total = bytes.len() as u64;

    let mut file = File::create(path.as_ref()).await.map_err(|e| {
        ErrorInfo::with_details(ErrorCode::FileOpenFailed, MODULE, e.to_string())
    })?;

    let mut done = 0u64;
    for chunk in bytes.chunks(IO_CHUNK_SIZE) {
        file.write_all(chunk).await.map_err(|e| {
            ErrorInfo::with_details(ErrorCode::FileWriteFailed, MODULE, e.to_string())
        })?;
        done += chunk.len() as u64;
        if let Some(callback) = &progress {
            callback(done, total);
        }
    }
    file.flush().await.map_err(|e| {
        ErrorInfo::with_details(ErrorCode::FileWriteFailed, MODULE, e.to_string())
    })?;
    Ok(())
}

/// Read a container from `path` in chunks (format auto-detected).
pub async fn load_async(path: impl AsRef<Path>, progress: Option<ProgressFn>) -> Result<Container> {
    let mut file = File::open(path.as_ref()).await.map_err(|e| {
        ErrorInfo::with_details(ErrorCode::FileOpenFailed, MODULE, e.to_string())
    })?;
    let total = file
        .metadata()
        .await
        .map(|metadata| metadata.len())
        .map_err(|e| ErrorInfo::with_details(ErrorCode::IoError, MODULE, e.to_string()))?;

    let mut buf = Vec::with_capacity(usize::try_from(total).unwrap_or(0).min(1 << 30));
    let mut chunk = vec![0u8; IO_CHUNK_SIZE];
    loop {
        let n = file
            .read(&mut chunk)
            .await
            .map_err(|e| ErrorInfo::with_details(ErrorCode::IoError, MODULE, e.to_string()))?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(callback) = &progress {
            callback(buf.len() as u64, total);
        }
    }
    Container::deserialize_auto(&buf)
}

/// Lazy finite sequence of emission chunks.
///
/// The wire form is produced once; chunks are then cut lazily so a consumer
/// can forward them without holding a second copy of the payload.
pub struct SerializedChunks {
    bytes: Vec<u8>,
    position: usize,
    chunk_size: usize,
}

impl SerializedChunks {
    /// Total bytes across all chunks.
    pub fn total_len(&self) -> usize {
        self.bytes.len()
    }
}

impl Iterator for SerializedChunks {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Vec<u8>> {
        if self.position >= self.bytes.len() {
            return None;
        }
        let end = (self.position + self.chunk_size).min(self.bytes.len());
        let chunk = self.bytes[self.position..end].to_vec();
        self.position = end;
        Some(chunk)
    }
}

/// Chunked emission of the canonical binary form.
pub fn serialize_chunked(container: &Container, chunk_size: usize) -> Result<SerializedChunks> {
    let bytes = container.to_bytes()?;
    Ok(SerializedChunks {
        bytes,
        position: 0,
        chunk_size: chunk_size.max(1),
    })
}

/// Incremental assembly of a serialized container from arriving chunks.
#[derive(Default)]
pub struct StreamingDecoder {
    buf: Vec<u8>,
}

impl StreamingDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one chunk.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Bytes buffered so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True when no chunk has arrived yet.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Parse the assembled payload (format auto-detected).
    pub fn finish(self) -> Result<Container> {
        Container::deserialize_auto(&self.buf)
    }
}

/// Drive a [`StreamingDecoder`] over a chunk sequence.
pub fn deserialize_streaming<I, C>(chunks: I) -> Result<Container>
where
    I: IntoIterator<Item = C>,
    C: AsRef<[u8]>,
{
    let mut decoder = StreamingDecoder::new();
    for chunk in chunks {
        decoder.push(chunk.as_ref());
    }
    decoder.finish()
}
