// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2022 irohaede <irohaede@proton.me>

//! Per-connection session handling: authenticate the trojan request, then dispatch to
//! the TCP or UDP relay.

mod tcp;
mod udp;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::{Result, TrojanError};
use crate::password::constant_time_eq;
use crate::proto::{Command, TrojanRequest, BUF_SIZE};
use crate::server::{ServerContext, HANDSHAKE_TIMEOUT};
use crate::stream::read_until_parsed;

/// Authenticate and run a single accepted, already-TLS-wrapped connection to
/// completion. Returns once the relay in either direction has ended.
pub async fn handle<S>(mut stream: S, ctx: &ServerContext) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf1 = vec![0u8; BUF_SIZE].into_boxed_slice();
    let mut buf2 = vec![0u8; BUF_SIZE].into_boxed_slice();

    let (req, parsed_n, read_n) = tokio::time::timeout(
        HANDSHAKE_TIMEOUT,
        read_until_parsed(&mut stream, &mut buf1, TrojanRequest::decode),
    )
    .await
    .map_err(|_| TrojanError::Read)??;

    if !constant_time_eq(&req.password, &ctx.password_hash) {
        return Err(TrojanError::BadPassword);
    }

    match Command::from_byte(req.cmd) {
        Some(Command::Connect) => {
            let payload = buf1[parsed_n..read_n].to_vec();
            tcp::run(stream, &*ctx.resolver, &req.addr, &payload, &mut buf1, &mut buf2).await
        }
        Some(Command::UdpAssociate) => {
            let carried = read_n - parsed_n;
            buf1.copy_within(parsed_n..read_n, 0);
            udp::run(stream, &*ctx.resolver, &mut buf1, &mut buf2, carried).await
        }
        Some(Command::Bind) | None => Err(TrojanError::UnknownCommand(req.cmd)),
    }
}
