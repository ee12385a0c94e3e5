// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2022 irohaede <irohaede@proton.me>

//! TCP relay (trojan `Connect`): one remote connection, two half-duplex copies.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::error::Result;
use crate::proto::Socks5Addr;
use crate::resolver::{resolve_addr, Resolver};
use crate::stream::{forward, write_all};

/// Connect to `addr`, flush any payload that rode in with the trojan request, then
/// relay until either side closes.
pub async fn run<S>(
    stream: S,
    resolver: &dyn Resolver,
    addr: &Socks5Addr,
    payload: &[u8],
    buf1: &mut [u8],
    buf2: &mut [u8],
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let remote_addr = resolve_addr(resolver, addr).await?;
    let mut remote = TcpStream::connect(remote_addr).await?;
    let _ = remote.set_nodelay(true);

    if !payload.is_empty() {
        write_all(&mut remote, payload).await?;
    }

    let (mut client_r, mut client_w) = tokio::io::split(stream);
    let (mut remote_r, mut remote_w) = remote.split();

    tokio::select! {
        _ = forward(&mut client_r, &mut remote_w, buf1) => {}
        _ = forward(&mut remote_r, &mut client_w, buf2) => {}
    }

    Ok(())
}
