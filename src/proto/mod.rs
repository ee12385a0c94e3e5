// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2022 irohaede <irohaede@proton.me>

//! Trojan Protocol
//!
//! Trojan is designed to build a tunnel through firewalls to bypass blocking and
//! censorship, by disguising an authenticated request inside an otherwise ordinary
//! TLS session.
//!
//! ``` text
//! client                server             remote
//!   |                     |                  |
//!   |-----tcp stream----->|                  |
//!   |<---tls handshake--->|                  |
//!   |---trojan request--->|                  |
//!   |                     |--tcp/udp-------->|
//!   |                     |<--payload------->|
//!   |<-------------------->|<---------------->|
//! ```
//!
//! See [`request::TrojanRequest`] and [`udp_packet::UdpHeader`] for the exact wire
//! layout of each message.

mod addr;
mod request;
mod udp_packet;

pub use addr::{Socks5Addr, MAX_ADDR_LEN};
pub use request::{Command, TrojanRequest};
pub use udp_packet::{UdpHeader, BUF_SIZE, MAX_HEADER_LEN};

pub(crate) const CRLF: &[u8] = b"\r\n";
