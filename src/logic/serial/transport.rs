//! Transport - Byte source behind a serial session
//!
//! The device link itself (port selection, baud rate, reconnect policy) is
//! handled outside this crate. A transport only opens, yields chunks and
//! closes.

use std::future::Future;
use std::io;
use std::path::PathBuf;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::constants::{DEFAULT_CHUNK_SIZE, STDIN_DEVICE};

/// Result of one read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadChunk {
    Data(Vec<u8>),
    Eof,
}

/// Asynchronous chunk source
pub trait Transport: Send {
    fn open(&mut self) -> impl Future<Output = io::Result<()>> + Send;

    /// Wait for the next chunk. May block for an unbounded time.
    fn read_chunk(&mut self) -> impl Future<Output = io::Result<ReadChunk>> + Send;

    fn close(&mut self) -> impl Future<Output = io::Result<()>> + Send;

    /// Human readable name for logs
    fn describe(&self) -> String;
}

fn not_open() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "transport is not open")
}

async fn read_into<R>(reader: &mut R, buf: &mut [u8]) -> io::Result<ReadChunk>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let n = reader.read(buf).await?;
    if n == 0 {
        Ok(ReadChunk::Eof)
    } else {
        Ok(ReadChunk::Data(buf[..n].to_vec()))
    }
}

// ============================================================================
// READER TRANSPORT
// ============================================================================

/// Wraps an already-open async reader (pipes, sockets, test buffers)
pub struct ReaderTransport<R> {
    label: String,
    reader: Option<R>,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin + Send> ReaderTransport<R> {
    pub fn new(label: impl Into<String>, reader: R) -> Self {
        Self::with_chunk_size(label, reader, DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(label: impl Into<String>, reader: R, chunk_size: usize) -> Self {
        Self {
            label: label.into(),
            reader: Some(reader),
            buf: vec![0; chunk_size.max(1)],
        }
    }
}

impl<R: AsyncRead + Unpin + Send> Transport for ReaderTransport<R> {
    async fn open(&mut self) -> io::Result<()> {
        if self.reader.is_none() {
            return Err(not_open());
        }
        Ok(())
    }

    async fn read_chunk(&mut self) -> io::Result<ReadChunk> {
        let reader = self.reader.as_mut().ok_or_else(not_open)?;
        read_into(reader, &mut self.buf).await
    }

    async fn close(&mut self) -> io::Result<()> {
        self.reader = None;
        Ok(())
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

// ============================================================================
// DEVICE TRANSPORT
// ============================================================================

/// Reads a device node or file path; `-` reads stdin
///
/// The port must already be configured, e.g. `stty -F /dev/ttyUSB0 115200 raw`.
pub struct DeviceTransport {
    path: PathBuf,
    reader: Option<Box<dyn AsyncRead + Unpin + Send>>,
    buf: Vec<u8>,
}

impl DeviceTransport {
    pub fn new(path: impl Into<PathBuf>, chunk_size: usize) -> Self {
        Self {
            path: path.into(),
            reader: None,
            buf: vec![0; chunk_size.max(1)],
        }
    }

    fn is_stdin(&self) -> bool {
        self.path.as_os_str() == STDIN_DEVICE
    }
}

impl Transport for DeviceTransport {
    async fn open(&mut self) -> io::Result<()> {
        let reader: Box<dyn AsyncRead + Unpin + Send> = if self.is_stdin() {
            Box::new(tokio::io::stdin())
        } else {
            Box::new(tokio::fs::File::open(&self.path).await?)
        };
        self.reader = Some(reader);
        log::info!("[Serial] Opened {}", self.describe());
        Ok(())
    }

    async fn read_chunk(&mut self) -> io::Result<ReadChunk> {
        let reader = self.reader.as_mut().ok_or_else(not_open)?;
        read_into(reader.as_mut(), &mut self.buf).await
    }

    async fn close(&mut self) -> io::Result<()> {
        if self.reader.take().is_some() {
            log::info!("[Serial] Closed {}", self.describe());
        }
        Ok(())
    }

    fn describe(&self) -> String {
        if self.is_stdin() {
            "stdin".to_string()
        } else {
            self.path.display().to_string()
        }
    }
}
