//! Chunked Line Reader
//!
//! Reads an async byte source in fixed-size chunks and yields newline-delimited
//! lines. A line whose bytes straddle two chunks is carried over and completed
//! by the next read; unterminated data at end of stream is the final line.
//!
//! Lines are decoded as strict UTF-8 only once complete, so a multi-byte
//! character split across a chunk boundary decodes correctly. A leading
//! byte-order mark and a trailing `\r` on each line are dropped.

use crate::error::IngestError;
use futures::Stream;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;

/// Default bytes requested per read.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Lazy, non-restartable line sequence over an async byte source.
pub struct LineReader<R> {
    source: R,
    chunk: Vec<u8>,
    /// Bytes read but not yet returned as lines
    buffer: Vec<u8>,
    /// Start of the next line within `buffer`
    cursor: usize,
    /// Bytes before this offset are known to contain no newline
    scanned: usize,
    eof: bool,
    lines_read: usize,
    cancel: Option<CancellationToken>,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            chunk: vec![0; DEFAULT_CHUNK_SIZE],
            buffer: Vec::new(),
            cursor: 0,
            scanned: 0,
            eof: false,
            lines_read: 0,
            cancel: None,
        }
    }

    /// Set the read size. Zero is bumped to one byte.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk = vec![0; chunk_size.max(1)];
        self
    }

    /// Abort at the next chunk read once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Number of lines yielded so far.
    pub const fn lines_read(&self) -> usize {
        self.lines_read
    }

    /// Next line without its terminator, or `None` at end of stream.
    pub async fn next_line(&mut self) -> Result<Option<String>, IngestError> {
        loop {
            let search_from = self.scanned.max(self.cursor);
            if let Some(offset) = self.buffer[search_from..].iter().position(|&b| b == b'\n') {
                let end = search_from + offset;
                let line = self.take_line(end)?;
                self.cursor = end + 1;
                self.scanned = self.cursor;
                return Ok(Some(line));
            }
            self.scanned = self.buffer.len();

            if self.eof {
                if self.cursor < self.buffer.len() {
                    let line = self.take_line(self.buffer.len())?;
                    self.cursor = self.buffer.len();
                    return Ok(Some(line));
                }
                return Ok(None);
            }

            self.fill().await?;
        }
    }

    /// Consume the reader as a `Stream` of lines. The stream ends after the
    /// first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<String, IngestError>> {
        futures::stream::try_unfold(self, |mut reader| async move {
            Ok(reader.next_line().await?.map(|line| (line, reader)))
        })
    }

    /// Read one chunk, compacting already-returned lines out of the buffer.
    async fn fill(&mut self) -> Result<(), IngestError> {
        if self.cursor > 0 {
            self.buffer.drain(..self.cursor);
            self.scanned -= self.cursor;
            self.cursor = 0;
        }

        let read = self.source.read(&mut self.chunk);
        let n = match &self.cancel {
            Some(token) => tokio::select! {
                biased;
                () = token.cancelled() => return Err(IngestError::Cancelled),
                n = read => n?,
            },
            None => read.await?,
        };

        if n == 0 {
            self.eof = true;
        } else {
            self.buffer.extend_from_slice(&self.chunk[..n]);
        }
        Ok(())
    }

    fn take_line(&mut self, end: usize) -> Result<String, IngestError> {
        let mut bytes = &self.buffer[self.cursor..end];
        if self.lines_read == 0 {
            bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        }
        if let Some(stripped) = bytes.strip_suffix(b"\r") {
            bytes = stripped;
        }

        self.lines_read += 1;
        String::from_utf8(bytes.to_vec()).map_err(|source| IngestError::Decode {
            line: self.lines_read,
            source,
        })
    }
}
