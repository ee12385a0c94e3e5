// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2022 irohaede <irohaede@proton.me>

use crate::error::{DecodeError, Decoded};

use super::addr::{Socks5Addr, MAX_ADDR_LEN};
use super::CRLF;

/// Largest buffer a session keeps per direction; a UDP payload longer than this is
/// fatal to the session (spec: `length <= BUF_SIZE`).
pub const BUF_SIZE: usize = 8192;

/// Trojan UDP packet header.
///
/// | socks5-addr | length (u16 be) | CRLF | payload |
///
/// Same shape as [`super::request::TrojanRequest`] minus password/cmd.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpHeader {
    pub addr: Socks5Addr,
    pub length: u16,
}

impl UdpHeader {
    pub fn encoded_len(&self) -> usize {
        self.addr.encoded_len() + 2 + 2
    }

    /// Encode into `dst`. Caller must ensure `dst.len() >= MAX_ADDR_LEN + 4`.
    pub fn encode(&self, dst: &mut [u8]) -> usize {
        let mut n = self.addr.encode(dst);
        dst[n..n + 2].copy_from_slice(&self.length.to_be_bytes());
        n += 2;
        dst[n..n + 2].copy_from_slice(CRLF);
        n + 2
    }

    /// Decode a header from the head of `src`. The caller is responsible for then
    /// reading exactly `length` payload bytes following the header.
    pub fn decode(src: &[u8]) -> Decoded<UdpHeader> {
        let (addr, addr_len) = match Socks5Addr::decode(src) {
            Decoded::Done { value, consumed } => (value, consumed),
            Decoded::MoreData => return Decoded::MoreData,
            Decoded::Err(e) => return Decoded::Err(e),
        };

        let Some(len_field) = src.get(addr_len..addr_len + 2) else {
            return Decoded::MoreData;
        };
        let length = u16::from_be_bytes([len_field[0], len_field[1]]);

        let crlf_start = addr_len + 2;
        match src.get(crlf_start..crlf_start + 2) {
            Some(crlf) if crlf == CRLF => {}
            Some(_) => return Decoded::Err(DecodeError::ErrCrlf),
            None => return Decoded::MoreData,
        }

        Decoded::Done {
            value: UdpHeader { addr, length },
            consumed: crlf_start + 2,
        }
    }
}

/// Largest byte length of an encoded header, used to size scratch buffers that only
/// ever hold a header (never payload).
pub const MAX_HEADER_LEN: usize = MAX_ADDR_LEN + 2 + 2;

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn roundtrip_ipv4() {
        let hdr = UdpHeader {
            addr: Socks5Addr::Ipv4(Ipv4Addr::new(8, 8, 8, 8), 53),
            length: 32,
        };
        let mut buf = [0u8; MAX_HEADER_LEN];
        let n = hdr.encode(&mut buf);
        assert_eq!(n, hdr.encoded_len());
        match UdpHeader::decode(&buf[..n]) {
            Decoded::Done { value, consumed } => {
                assert_eq!(consumed, n);
                assert_eq!(value, hdr);
            }
            _ => panic!("expected Done"),
        }
    }

    #[test]
    fn roundtrip_all_lengths() {
        for length in [0u16, 1, 255, 4096, 65535] {
            let hdr = UdpHeader {
                addr: Socks5Addr::Domain("example.com".into(), 443),
                length,
            };
            let mut buf = [0u8; MAX_HEADER_LEN];
            let n = hdr.encode(&mut buf);
            match UdpHeader::decode(&buf[..n]) {
                Decoded::Done { value, .. } => assert_eq!(value.length, length),
                _ => panic!("expected Done"),
            }
        }
    }

    #[test]
    fn partial_input_is_more_data() {
        let hdr = UdpHeader {
            addr: Socks5Addr::Ipv6(std::net::Ipv6Addr::LOCALHOST, 1234),
            length: 10,
        };
        let mut buf = [0u8; MAX_HEADER_LEN];
        let n = hdr.encode(&mut buf);
        for k in 0..n {
            assert!(matches!(UdpHeader::decode(&buf[..k]), Decoded::MoreData));
        }
    }

    #[test]
    fn bad_crlf_is_err_crlf() {
        let hdr = UdpHeader {
            addr: Socks5Addr::Ipv4(Ipv4Addr::LOCALHOST, 1),
            length: 0,
        };
        let mut buf = [0u8; MAX_HEADER_LEN];
        let n = hdr.encode(&mut buf);
        buf[n - 2] = b'X';
        assert!(matches!(
            UdpHeader::decode(&buf[..n]),
            Decoded::Err(DecodeError::ErrCrlf)
        ));
    }
}
