// SPDX-License-Identifier: MIT OR Apache-2.0
//! Newline-delimited JSON framing over a duplex byte stream.

use ng_protocol::MAX_ENVELOPE_BYTES;
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// One byte above the wire size limit, so an oversize frame is still
/// returned to the caller (to be rejected by the validator's own size
/// check) rather than silently truncated.
const READ_CAP: u64 = (MAX_ENVELOPE_BYTES + 1) as u64;

/// Reads one `\n`-terminated frame, stripping the trailing newline.
///
/// Reads are capped at [`READ_CAP`] bytes regardless of whether a newline
/// is found, so a peer cannot force unbounded buffering.
pub async fn read_frame<R>(reader: &mut R) -> io::Result<Vec<u8>>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let mut limited = AsyncReadExt::take(reader, READ_CAP);
    limited.read_until(b'\n', &mut buf).await?;
    if buf.last() == Some(&b'\n') {
        buf.pop();
    }
    Ok(buf)
}

/// Writes `bytes` as one `\n`-terminated frame and flushes.
pub async fn write_frame<W>(writer: &mut W, bytes: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(bytes).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}
