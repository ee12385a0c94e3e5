// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2022 irohaede <irohaede@proton.me>

//! Stream primitives shared by the TCP and UDP session handlers.
//!
//! All four primitives are generic over any `AsyncRead + AsyncWrite` stream: the
//! client-facing TLS stream, the plain TCP socket to the remote, and (for framed
//! header reads) the TLS stream again in the UDP handler.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Decoded, Result, TrojanError};

/// How long a relay direction or a UDP steady-state loop may wait for the next byte
/// before the session is torn down. spec.md §9 flags the absence of any timeout as a
/// known limitation ("a silent peer pins one session worth of resources indefinitely")
/// — this is the rewrite's fix.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Read into `buf` until `decode` reports a complete message, growing the read past
/// `MoreData` results. Returns the decoded value, the number of bytes it consumed, and
/// the total number of bytes read — bytes in `buf[parsed_n..read_n]` are early-arrived
/// payload the caller must carry forward.
pub async fn read_until_parsed<S, T>(
    stream: &mut S,
    buf: &mut [u8],
    mut decode: impl FnMut(&[u8]) -> Decoded<T>,
) -> Result<(T, usize, usize)>
where
    S: AsyncRead + Unpin,
{
    let mut read_n = 0;

    loop {
        let n = stream.read(&mut buf[read_n..]).await?;
        if n == 0 {
            return Err(TrojanError::Read);
        }
        read_n += n;

        match decode(&buf[..read_n]) {
            Decoded::Done { value, consumed } => return Ok((value, consumed, read_n)),
            Decoded::MoreData => continue,
            Decoded::Err(e) => return Err(e.into()),
        }
    }
}

/// Read precisely `buf.len()` bytes. Any short read (EOF before the buffer fills) or
/// I/O error is [`TrojanError::Read`].
pub async fn read_exact<S>(stream: &mut S, buf: &mut [u8]) -> Result<()>
where
    S: AsyncRead + Unpin,
{
    stream.read_exact(buf).await.map_err(|_| TrojanError::Read)?;
    Ok(())
}

/// Write the entire slice, looping around partial writes. A write of zero bytes or an
/// I/O error is [`TrojanError::Write`].
pub async fn write_all<S>(stream: &mut S, buf: &[u8]) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(buf).await.map_err(|_| TrojanError::Write)?;
    Ok(())
}

/// Half-duplex copy: repeatedly read up to `scratch.len()` bytes from `src` and write
/// them all to `dst`. Terminates quietly (no error) on either side's error, EOF, or an
/// [`IDLE_TIMEOUT`] with no bytes read — the caller only cares that the relay ended,
/// not why.
pub async fn forward<R, W>(src: &mut R, dst: &mut W, scratch: &mut [u8])
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        let n = match tokio::time::timeout(IDLE_TIMEOUT, src.read(scratch)).await {
            Ok(Ok(0)) | Ok(Err(_)) | Err(_) => return,
            Ok(Ok(n)) => n,
        };
        if write_all(dst, &scratch[..n]).await.is_err() {
            return;
        }
    }
}

/// Like [`read_exact`] but bounded by [`IDLE_TIMEOUT`]; for the point in a loop where
/// the next message may never arrive (waiting on an idle client or UDP socket).
pub async fn read_exact_idle<S>(stream: &mut S, buf: &mut [u8]) -> Result<()>
where
    S: AsyncRead + Unpin,
{
    tokio::time::timeout(IDLE_TIMEOUT, read_exact(stream, buf))
        .await
        .map_err(|_| TrojanError::Read)?
}
