//! Newline-delimited JSON framing over any tokio byte stream.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use sentinel_shared::constants::MAX_FRAME_LEN;
use sentinel_shared::error::ProtocolError;
use sentinel_shared::protocol::{decode_line, encode_line};

use crate::error::Result;

/// Reads one JSON frame per line.
///
/// At most `max_len + 1` bytes of a line are ever buffered. Longer lines
/// are rejected as soon as the cap is hit and the rest of the line is
/// discarded on the next read.
pub struct FrameReader<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
    max_len: usize,
    skipping: bool,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_max_len(reader, MAX_FRAME_LEN)
    }

    pub fn with_max_len(reader: R, max_len: usize) -> Self {
        Self {
            reader: BufReader::new(reader),
            buf: Vec::new(),
            max_len,
            skipping: false,
        }
    }

    /// Next frame, or `None` once the stream reaches EOF.
    ///
    /// Blank lines are skipped. A line that fails to decode or exceeds the
    /// cap yields `Err(NetError::Protocol)` and leaves the reader usable.
    pub async fn next<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        loop {
            if self.skipping {
                if !self.discard_line().await? {
                    return Ok(None);
                }
                self.skipping = false;
            }

            self.buf.clear();
            let limit = self.max_len as u64 + 1;
            let read = (&mut self.reader)
                .take(limit)
                .read_until(b'\n', &mut self.buf)
                .await?;
            if read == 0 {
                return Ok(None);
            }

            let terminated = self.buf.last() == Some(&b'\n');
            if !terminated && self.buf.len() > self.max_len {
                self.skipping = true;
                return Err(ProtocolError::TooLarge {
                    len: self.buf.len(),
                    max: self.max_len,
                }
                .into());
            }

            let line = std::str::from_utf8(&self.buf)
                .map_err(ProtocolError::from)?
                .trim_end_matches(|c: char| c == '\n' || c == '\r');
            if line.trim().is_empty() {
                continue;
            }
            return Ok(Some(decode_line(line)?));
        }
    }

    /// Drop bytes up to and including the next newline. Returns `false` on
    /// EOF.
    async fn discard_line(&mut self) -> Result<bool> {
        loop {
            let (used, found) = {
                let available = self.reader.fill_buf().await?;
                if available.is_empty() {
                    return Ok(false);
                }
                match available.iter().position(|b| *b == b'\n') {
                    Some(i) => (i + 1, true),
                    None => (available.len(), false),
                }
            };
            self.reader.consume(used);
            if found {
                return Ok(true);
            }
        }
    }
}

pub async fn write_frame<W, T>(writer: &mut W, frame: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut line = encode_line(frame)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
