// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2022 irohaede <irohaede@proton.me>

use crate::error::{DecodeError, Decoded};

use super::addr::Socks5Addr;
use super::CRLF;

/// Minimum bytes needed before a decode attempt can even start:
/// `password(56) + crlf(2) + cmd(1) + atyp(1) + ipv4(4) + port(2) + crlf(2)`.
const MIN_REQUEST_LEN: usize = 56 + 2 + 1 + 1 + 4 + 2 + 2;

/// Trojan (Socks5-like) command.
///
/// `Bind` is part of the wire format's command byte range but this server never
/// dispatches it to a relay path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    Connect = 0x01,
    Bind = 0x02,
    UdpAssociate = 0x03,
}

impl Command {
    pub fn from_byte(byte: u8) -> Option<Command> {
        match byte {
            0x01 => Some(Command::Connect),
            0x02 => Some(Command::Bind),
            0x03 => Some(Command::UdpAssociate),
            _ => None,
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Command::Connect => "connect",
            Command::Bind => "bind",
            Command::UdpAssociate => "udp-associate",
        };
        f.write_str(s)
    }
}

/// Trojan Request
///
/// | password\[56\] | CRLF | cmd | socks5-addr | CRLF | payload |
///
/// The decoder does not validate `cmd` semantically (matching the wire protocol: an
/// unrecognized command byte is not itself malformed data). Dispatch decides whether
/// to act on it; see [`Command::from_byte`].
pub struct TrojanRequest {
    pub password: [u8; 56],
    pub cmd: u8,
    pub addr: Socks5Addr,
}

impl TrojanRequest {
    /// Decode a trojan request from the head of `src`. Returns the parsed request and
    /// the number of bytes consumed; any bytes beyond that are early-arrived payload.
    pub fn decode(src: &[u8]) -> Decoded<TrojanRequest> {
        if src.len() < MIN_REQUEST_LEN {
            return Decoded::MoreData;
        }

        let mut password = [0u8; 56];
        password.copy_from_slice(&src[..56]);

        if &src[56..58] != CRLF {
            return Decoded::Err(DecodeError::ErrCrlf);
        }

        let cmd = src[58];

        let (addr, addr_len) = match Socks5Addr::decode(&src[59..]) {
            Decoded::Done { value, consumed } => (value, consumed),
            Decoded::MoreData => return Decoded::MoreData,
            Decoded::Err(e) => return Decoded::Err(e),
        };

        let tail_start = 59 + addr_len;
        match src.get(tail_start..tail_start + 2) {
            Some(crlf) if crlf == CRLF => {}
            Some(_) => return Decoded::Err(DecodeError::ErrCrlf),
            None => return Decoded::MoreData,
        }

        Decoded::Done {
            value: TrojanRequest { password, cmd, addr },
            consumed: tail_start + 2,
        }
    }

    /// Required destination capacity: `password(56) + crlf(2) + cmd(1) + addr(<=258) + crlf(2)`.
    pub fn encoded_len(&self) -> usize {
        56 + 2 + 1 + self.addr.encoded_len() + 2
    }

    /// Encode into `dst`. Caller must ensure `dst.len() >= 56 + 2 + 1 + MAX_ADDR_LEN + 2`.
    pub fn encode(&self, dst: &mut [u8]) -> usize {
        let mut n = 0;
        dst[..56].copy_from_slice(&self.password);
        n += 56;
        dst[n..n + 2].copy_from_slice(CRLF);
        n += 2;
        dst[n] = self.cmd;
        n += 1;
        n += self.addr.encode(&mut dst[n..]);
        dst[n..n + 2].copy_from_slice(CRLF);
        n += 2;
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::addr::MAX_ADDR_LEN;
    use std::net::Ipv4Addr;

    fn sample(cmd: Command, addr: Socks5Addr) -> TrojanRequest {
        TrojanRequest {
            password: [b'a'; 56],
            cmd: cmd as u8,
            addr,
        }
    }

    #[test]
    fn roundtrip_connect() {
        let req = sample(Command::Connect, Socks5Addr::Ipv4(Ipv4Addr::new(1, 2, 3, 4), 80));
        let mut buf = [0u8; 56 + 2 + 1 + MAX_ADDR_LEN + 2];
        let n = req.encode(&mut buf);
        assert_eq!(n, req.encoded_len());
        match TrojanRequest::decode(&buf[..n]) {
            Decoded::Done { value, consumed } => {
                assert_eq!(consumed, n);
                assert_eq!(value.password, req.password);
                assert_eq!(Command::from_byte(value.cmd), Some(Command::Connect));
                assert_eq!(value.addr, req.addr);
            }
            _ => panic!("expected Done"),
        }
    }

    #[test]
    fn roundtrip_udp_associate_domain() {
        let req = sample(
            Command::UdpAssociate,
            Socks5Addr::Domain("dns.google".into(), 53),
        );
        let mut buf = [0u8; 56 + 2 + 1 + MAX_ADDR_LEN + 2];
        let n = req.encode(&mut buf);
        match TrojanRequest::decode(&buf[..n]) {
            Decoded::Done { value, consumed } => {
                assert_eq!(consumed, n);
                assert_eq!(Command::from_byte(value.cmd), Some(Command::UdpAssociate));
            }
            _ => panic!("expected Done"),
        }
    }

    #[test]
    fn unknown_command_byte_still_decodes() {
        let req = sample(Command::Connect, Socks5Addr::Ipv4(Ipv4Addr::LOCALHOST, 80));
        let mut buf = [0u8; 56 + 2 + 1 + MAX_ADDR_LEN + 2];
        let n = req.encode(&mut buf);
        buf[58] = 0x7f;
        match TrojanRequest::decode(&buf[..n]) {
            Decoded::Done { value, .. } => {
                assert_eq!(value.cmd, 0x7f);
                assert_eq!(Command::from_byte(value.cmd), None);
            }
            _ => panic!("expected Done"),
        }
    }

    #[test]
    fn partial_input_is_more_data() {
        let req = sample(Command::Connect, Socks5Addr::Ipv4(Ipv4Addr::LOCALHOST, 443));
        let mut buf = [0u8; 56 + 2 + 1 + MAX_ADDR_LEN + 2];
        let n = req.encode(&mut buf);
        for k in 0..n {
            assert!(matches!(TrojanRequest::decode(&buf[..k]), Decoded::MoreData));
        }
    }

    #[test]
    fn carried_over_payload_is_left_for_caller() {
        let req = sample(Command::Connect, Socks5Addr::Ipv4(Ipv4Addr::LOCALHOST, 80));
        let mut buf = Vec::new();
        let mut head = [0u8; 56 + 2 + 1 + MAX_ADDR_LEN + 2];
        let n = req.encode(&mut head);
        buf.extend_from_slice(&head[..n]);
        buf.extend_from_slice(b"PING");

        match TrojanRequest::decode(&buf) {
            Decoded::Done { consumed, .. } => {
                assert_eq!(consumed, n);
                assert_eq!(&buf[consumed..], b"PING");
            }
            _ => panic!("expected Done"),
        }
    }

    #[test]
    fn bad_crlf_after_password_is_err_crlf() {
        let mut buf = [0u8; MIN_REQUEST_LEN];
        buf[..56].copy_from_slice(&[b'a'; 56]);
        buf[56] = b'X';
        buf[57] = b'\n';
        assert!(matches!(
            TrojanRequest::decode(&buf),
            Decoded::Err(DecodeError::ErrCrlf)
        ));
    }
}
