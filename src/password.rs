// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2022 irohaede <irohaede@proton.me>

//! Password hashing and comparison.
//!
//! The trojan wire format presents a password as the lowercase hex encoding of its
//! SHA-224 digest, 56 bytes long.

use sha2::{Digest, Sha224};

/// SHA-224 of `password`, rendered as 56 lowercase hex bytes.
pub fn sha224_hex(password: &[u8]) -> [u8; 56] {
    let digest = Sha224::digest(password);
    let mut hex = [0u8; 56];
    for (i, b) in digest.iter().enumerate() {
        let (h0, h1) = byte_to_hex(*b);
        hex[2 * i] = h0;
        hex[2 * i + 1] = h1;
    }
    hex
}

fn byte_to_hex(b: u8) -> (u8, u8) {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    (DIGITS[(b >> 4) as usize], DIGITS[(b & 0x0f) as usize])
}

/// Constant-time comparison of two equal-length byte slices.
///
/// The wire decoder always hands back fixed 56-byte arrays, so length mismatches
/// aren't a real case; the fold still degrades to `false` rather than panicking if
/// lengths differ.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        // SHA-224("hunter2")
        let hex = sha224_hex(b"hunter2");
        let s = std::str::from_utf8(&hex).unwrap();
        assert_eq!(s.len(), 56);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn constant_time_eq_matches_eq() {
        let a = sha224_hex(b"hunter2");
        let b = sha224_hex(b"hunter2");
        let c = sha224_hex(b"hunter3");
        assert!(constant_time_eq(&a, &b));
        assert!(!constant_time_eq(&a, &c));
    }
}
