//! Line codec for the JSON-lines wire protocol.
//!
//! Frame format:
//! ```text
//! ┌───────────────────────────────┬────┐
//! │ UTF-8 JSON object (no \n)     │ \n │
//! └───────────────────────────────┴────┘
//! ```
//! A trailing `\r` is tolerated on input. Lines longer than the configured
//! maximum are discarded up to the next newline and reported as
//! `InvalidData`, leaving the stream positioned at the following line.

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::types::Result;

/// Default cap for one inbound line.
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

/// Serialize `value` as one JSON line, newline included.
pub fn encode_line<T: Serialize>(value: &T) -> Result<String> {
    let mut line = serde_json::to_string(value)?;
    line.push('\n');
    Ok(line)
}

/// Write one encoded line and flush.
pub async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> std::io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Write several encoded lines with a single flush at the end.
pub async fn write_lines<W: AsyncWrite + Unpin>(
    writer: &mut W,
    lines: &[String],
) -> std::io::Result<()> {
    for line in lines {
        writer.write_all(line.as_bytes()).await?;
    }
    writer.flush().await?;
    Ok(())
}

/// Read one line, without its terminator.
///
/// Returns `None` on clean EOF.
pub async fn read_line<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    max_line_bytes: usize,
) -> std::io::Result<Option<String>> {
    let mut pending = Vec::new();
    read_line_into(reader, &mut pending, max_line_bytes).await
}

/// Cancel-safe [`read_line`]: bytes of an unfinished line stay in `pending`
/// when the future is dropped, and the next call continues from them.
pub async fn read_line_into<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    pending: &mut Vec<u8>,
    max_line_bytes: usize,
) -> std::io::Result<Option<String>> {
    let remaining = max_line_bytes.saturating_add(1).saturating_sub(pending.len());
    let limit = u64::try_from(remaining).unwrap_or(u64::MAX);
    let n = (&mut *reader).take(limit).read_until(b'\n', pending).await?;
    if n == 0 && pending.is_empty() {
        return Ok(None);
    }

    let mut buf = std::mem::take(pending);
    if buf.last() == Some(&b'\n') {
        buf.pop();
    } else if buf.len() > max_line_bytes {
        skip_to_newline(reader).await?;
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Line too long: more than {} bytes", max_line_bytes),
        ));
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }

    String::from_utf8(buf)
        .map(Some)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

async fn skip_to_newline<R: AsyncBufRead + Unpin>(reader: &mut R) -> std::io::Result<()> {
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(());
        }
        if let Some(pos) = available.iter().position(|b| *b == b'\n') {
            reader.consume(pos + 1);
            return Ok(());
        }
        let len = available.len();
        reader.consume(len);
    }
}
