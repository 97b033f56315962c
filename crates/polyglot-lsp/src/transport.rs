//! Duplex byte channel over a server process's stdout/stdin.
//!
//! The two directions are locked independently so the reading task never
//! blocks writers. Closing is exactly-once and always releases the write
//! side, even when shutting it down fails.
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

use crate::error::LspError;

type BoxedReader = BufReader<Box<dyn AsyncRead + Send + Unpin>>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

fn closed() -> LspError {
    LspError::Transport("transport closed".into())
}

/// One process's output and input streams presented as a single channel.
pub struct Transport {
    reader: Mutex<Option<BoxedReader>>,
    writer: Mutex<Option<BoxedWriter>>,
    closed: AtomicBool,
}

impl Transport {
    /// Wrap a read stream (the server's stdout) and a write stream (its stdin).
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let reader: Box<dyn AsyncRead + Send + Unpin> = Box::new(reader);
        let writer: BoxedWriter = Box::new(writer);
        Self {
            reader: Mutex::new(Some(BufReader::new(reader))),
            writer: Mutex::new(Some(writer)),
            closed: AtomicBool::new(false),
        }
    }

    /// Read available bytes into `buf`. Returns 0 at end of stream.
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize, LspError> {
        let mut guard = self.reader.lock().await;
        let reader = guard.as_mut().ok_or_else(closed)?;
        reader.read(buf).await.map_err(LspError::transport)
    }

    /// Read one `\n`-terminated line, appending it to `buf`.
    pub async fn read_line(&self, buf: &mut String) -> Result<usize, LspError> {
        let mut guard = self.reader.lock().await;
        let reader = guard.as_mut().ok_or_else(closed)?;
        reader.read_line(buf).await.map_err(LspError::transport)
    }

    /// Fill `buf` completely.
    pub async fn read_exact(&self, buf: &mut [u8]) -> Result<(), LspError> {
        let mut guard = self.reader.lock().await;
        let reader = guard.as_mut().ok_or_else(closed)?;
        reader
            .read_exact(buf)
            .await
            .map(|_| ())
            .map_err(LspError::transport)
    }

    /// Write all of `buf` and flush.
    ///
    /// A write that was in progress when the transport closed releases the
    /// write side once it returns.
    pub async fn write(&self, buf: &[u8]) -> Result<(), LspError> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or_else(closed)?;
        let result = match writer.write_all(buf).await {
            Ok(()) => writer.flush().await.map_err(LspError::transport),
            Err(e) => Err(LspError::transport(e)),
        };
        if self.is_closed() {
            if let Some(mut writer) = guard.take() {
                let _ = writer.shutdown().await;
            }
        }
        result
    }

    /// Close both directions without waiting on in-flight I/O. Only the
    /// first call does any work.
    ///
    /// A read or write in progress keeps its stream until it returns; the
    /// stream is then released. An idle write side is shut down here, and a
    /// failure to do so is returned.
    pub async fn close(&self) -> Result<(), LspError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        match self.reader.try_lock() {
            Ok(mut guard) => drop(guard.take()),
            Err(_) => tracing::debug!("read in progress while closing transport"),
        }
        let writer = match self.writer.try_lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => {
                tracing::debug!("write in progress while closing transport");
                None
            }
        };
        match writer {
            Some(mut writer) => writer.shutdown().await.map_err(LspError::transport),
            None => Ok(()),
        }
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("closed", &self.is_closed())
            .finish()
    }
}
