//! Byte sinks
//!
//! A sink is opened once per run and only ever appended to. Every failure is
//! reported as [`Error::SinkWriteFailure`] and ends the run.

use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

/// Append-only destination for downloaded bytes
#[async_trait]
pub trait ByteSink: Send {
    /// Append bytes in arrival order
    async fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Push buffered bytes to the destination
    async fn flush(&mut self) -> Result<()>;

    /// Flush and close; returns the total bytes written
    async fn finish(&mut self) -> Result<u64>;

    /// Bytes accepted so far
    fn bytes_written(&self) -> u64;

    /// Human-readable destination for messages
    fn describe(&self) -> String;
}

// ============================================================================
// File Sink
// ============================================================================

/// Sink backed by a file that is created (or truncated) on open
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    writer: BufWriter<File>,
    bytes_written: u64,
}

impl FileSink {
    /// Create or truncate the file at `path`
    pub async fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)
            .await
            .map_err(|e| Error::sink(path.display().to_string(), e.to_string()))?;
        debug!("Opened {} for writing", path.display());

        Ok(Self {
            path,
            writer: BufWriter::new(file),
            bytes_written: 0,
        })
    }

    /// Destination path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn failure(&self, e: std::io::Error) -> Error {
        Error::sink(self.path.display().to_string(), e.to_string())
    }
}

#[async_trait]
impl ByteSink for FileSink {
    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if let Err(e) = self.writer.write_all(bytes).await {
            return Err(self.failure(e));
        }
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        if let Err(e) = self.writer.flush().await {
            return Err(self.failure(e));
        }
        Ok(())
    }

    async fn finish(&mut self) -> Result<u64> {
        self.flush().await?;
        if let Err(e) = self.writer.get_mut().sync_all().await {
            return Err(self.failure(e));
        }
        Ok(self.bytes_written)
    }

    fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

// ============================================================================
// Memory Sink
// ============================================================================

/// Sink that keeps everything in an in-memory buffer
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    buffer: BytesMut,
}

impl MemorySink {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes written so far
    pub fn contents(&self) -> &[u8] {
        &self.buffer
    }

    /// Contents as UTF-8 text (lossy)
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.buffer).into_owned()
    }

    /// Freeze the buffer
    pub fn into_inner(self) -> Bytes {
        self.buffer.freeze()
    }
}

#[async_trait]
impl ByteSink for MemorySink {
    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.buffer.extend_from_slice(bytes);
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    async fn finish(&mut self) -> Result<u64> {
        Ok(self.buffer.len() as u64)
    }

    fn bytes_written(&self) -> u64 {
        self.buffer.len() as u64
    }

    fn describe(&self) -> String {
        "<memory>".to_string()
    }
}
