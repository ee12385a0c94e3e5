// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2022 irohaede <irohaede@proton.me>

//! Error kinds shared by the codecs, the stream primitives and the session handlers.

use std::fmt::{self, Display, Formatter};
use std::io;

/// Malformed wire data, returned by the SOCKS5-style address decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// `atyp` is not one of `{0x01, 0x03, 0x04}`.
    ErrAtyp,
    /// FQDN length byte is zero.
    ErrFqdnLen,
    /// A required `CR LF` delimiter is missing.
    ErrCrlf,
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            DecodeError::ErrAtyp => "unknown address type",
            DecodeError::ErrFqdnLen => "zero-length domain name",
            DecodeError::ErrCrlf => "missing CRLF delimiter",
        };
        f.write_str(s)
    }
}

impl std::error::Error for DecodeError {}

/// Outcome of a single decode attempt over a possibly-incomplete byte slice.
///
/// `MoreData` is a control signal, not an error: it means "valid so far, need more
/// bytes" and callers loop on it instead of aborting.
pub enum Decoded<T> {
    Done { value: T, consumed: usize },
    MoreData,
    Err(DecodeError),
}

/// Every terminal failure a session handler can hit.
#[derive(Debug)]
pub enum TrojanError {
    /// Trojan request or UDP packet header failed to parse.
    Protocol(DecodeError),
    /// The trojan command byte decoded fine but is not one this server relays.
    UnknownCommand(u8),
    /// Password presented by the client did not match the configured one.
    BadPassword,
    /// Stream read failed or hit EOF before a message was fully parsed.
    Read,
    /// Stream write failed or wrote zero bytes.
    Write,
    /// Destination hostname failed to resolve.
    Resolve,
    /// UDP packet payload exceeds the session's buffer capacity.
    UdpPacketTooLarge,
    /// Wraps I/O errors from TLS handshake, connect, or socket setup.
    Io(io::Error),
}

impl Display for TrojanError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TrojanError::Protocol(e) => write!(f, "invalid trojan request: {}", e),
            TrojanError::UnknownCommand(b) => write!(f, "unsupported trojan command {:#04x}", b),
            TrojanError::BadPassword => f.write_str("incorrect password"),
            TrojanError::Read => f.write_str("read failed or connection closed"),
            TrojanError::Write => f.write_str("write failed"),
            TrojanError::Resolve => f.write_str("failed to resolve destination"),
            TrojanError::UdpPacketTooLarge => f.write_str("udp packet exceeds buffer capacity"),
            TrojanError::Io(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for TrojanError {}

impl From<io::Error> for TrojanError {
    fn from(e: io::Error) -> Self {
        TrojanError::Io(e)
    }
}

impl From<DecodeError> for TrojanError {
    fn from(e: DecodeError) -> Self {
        TrojanError::Protocol(e)
    }
}

pub type Result<T> = std::result::Result<T, TrojanError>;
