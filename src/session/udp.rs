// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2022 irohaede <irohaede@proton.me>

//! UDP relay (trojan `UdpAssociate`).
//!
//! The TLS stream carries a sequence of trojan-framed datagrams in each direction; the
//! server bridges them to one unconnected [`UdpSocket`], resolving the destination
//! fresh for every outbound record rather than fixing it to whatever the first
//! datagram named. A client multiplexing several destinations over one association
//! (DNS to one resolver, QUIC to another) depends on this.

use std::net::SocketAddr;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UdpSocket;

use crate::error::{DecodeError, Decoded, Result, TrojanError};
use crate::proto::UdpHeader;
use crate::resolver::{resolve_addr, Resolver};
use crate::stream::{read_exact, read_exact_idle, write_all};

async fn fill_header<S>(stream: &mut S, buf: &mut [u8], already: usize) -> Result<UdpHeader>
where
    S: AsyncRead + Unpin,
{
    if already < 2 {
        read_exact_idle(stream, &mut buf[already..2]).await?;
    }

    let header_len = match buf[0] {
        0x01 => 1 + 4 + 2 + 2 + 2,                    // ipv4
        0x04 => 1 + 16 + 2 + 2 + 2,                   // ipv6
        0x03 => 1 + 1 + buf[1] as usize + 2 + 2 + 2,  // fqdn
        _ => return Err(DecodeError::ErrAtyp.into()),
    };

    let have = already.max(2);
    if have < header_len {
        read_exact(stream, &mut buf[have..header_len]).await?;
    }

    match UdpHeader::decode(&buf[..header_len]) {
        Decoded::Done { value, consumed } if consumed == header_len => Ok(value),
        Decoded::Err(e) => Err(e.into()),
        _ => Err(TrojanError::Protocol(DecodeError::ErrCrlf)),
    }
}

/// Bind an unconnected UDP socket for the lifetime of one association, on the
/// protocol family of `dest` (the first resolved destination), matching
/// `examples/original_source/src/service.cpp`'s `udp_socket.open(remote_addr.protocol())`.
/// `SO_REUSEADDR` is set before bind so a burst of short-lived associations on the same
/// ephemeral port range doesn't trip `EADDRINUSE` while the previous socket's
/// `TIME_WAIT`-like teardown is still draining.
fn bind_udp_socket(dest: SocketAddr) -> Result<UdpSocket> {
    let (domain, unspecified) = match dest {
        SocketAddr::V4(_) => (Domain::IPV4, SocketAddr::from(([0, 0, 0, 0], 0))),
        SocketAddr::V6(_) => (Domain::IPV6, SocketAddr::from(([0, 0, 0, 0, 0, 0, 0, 0], 0))),
    };

    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&unspecified.into())?;
    Ok(UdpSocket::from_std(socket.into())?)
}

/// Run one UDP association to completion. `offset` is the number of bytes already
/// sitting at the front of `buf1` (bytes that rode in with the trojan request).
pub async fn run<S>(
    stream: S,
    resolver: &dyn Resolver,
    buf1: &mut [u8],
    buf2: &mut [u8],
    offset: usize,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut stream_r, mut stream_w) = tokio::io::split(stream);

    let header = fill_header(&mut stream_r, buf1, offset).await?;
    let length = header.length as usize;
    if length > buf1.len() {
        return Err(TrojanError::UdpPacketTooLarge);
    }
    read_exact(&mut stream_r, &mut buf1[..length]).await?;
    let dest = resolve_addr(resolver, &header.addr).await?;

    // Bound to dest's family only after the first destination is known, per the
    // "ephemeral port of the first destination's protocol family" requirement — a
    // socket opened before this point could guess the wrong family.
    let socket = bind_udp_socket(dest)?;
    socket.send_to(&buf1[..length], dest).await?;

    tokio::select! {
        _ = tcp_to_udp(&mut stream_r, &socket, resolver, buf1) => {}
        _ = udp_to_tcp(&socket, &mut stream_w, buf2) => {}
    }

    Ok(())
}

async fn tcp_to_udp<S>(stream: &mut S, socket: &UdpSocket, resolver: &dyn Resolver, buf: &mut [u8])
where
    S: AsyncRead + Unpin,
{
    loop {
        let header = match fill_header(stream, buf, 0).await {
            Ok(h) => h,
            Err(_) => return,
        };
        let length = header.length as usize;
        if length > buf.len() {
            return;
        }
        if read_exact(stream, &mut buf[..length]).await.is_err() {
            return;
        }
        let dest = match resolve_addr(resolver, &header.addr).await {
            Ok(d) => d,
            Err(_) => return,
        };
        if socket.send_to(&buf[..length], dest).await.is_err() {
            return;
        }
    }
}

async fn udp_to_tcp<S>(socket: &UdpSocket, stream: &mut S, buf: &mut [u8])
where
    S: AsyncWrite + Unpin,
{
    // Source addresses here are always concrete IPs off the socket, never FQDNs, so
    // the encoded header never exceeds an IPv6 address field.
    let mut scratch = [0u8; 256];

    loop {
        let (n, src) = match tokio::time::timeout(crate::stream::IDLE_TIMEOUT, socket.recv_from(buf)).await {
            Ok(Ok(v)) => v,
            Ok(Err(_)) | Err(_) => return,
        };
        let header = UdpHeader {
            addr: src.into(),
            length: n as u16,
        };
        let hn = header.encode(&mut scratch);
        if write_all(stream, &scratch[..hn]).await.is_err() {
            return;
        }
        if write_all(stream, &buf[..n]).await.is_err() {
            return;
        }
    }
}
