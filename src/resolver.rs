// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2022 irohaede <irohaede@proton.me>

//! Address resolution.
//!
//! Numeric-IP addresses never touch a resolver; FQDN addresses are dispatched to a
//! shared, thread-safe [`Resolver`] held once on the server and reused across every
//! session (spec.md: "A TCP resolver and a UDP resolver, reused across sessions" — in
//! this runtime both collapse into the same `getaddrinfo`-backed lookup).

use std::net::SocketAddr;

use async_trait::async_trait;

use crate::error::{Result, TrojanError};
use crate::proto::Socks5Addr;

/// A hostname → endpoint lookup, dispatched to for the FQDN address variant only.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, host: &str, port: u16) -> std::io::Result<SocketAddr>;
}

/// Resolver backed by the async runtime's own `getaddrinfo` wrapper.
pub struct TokioResolver;

#[async_trait]
impl Resolver for TokioResolver {
    async fn resolve(&self, host: &str, port: u16) -> std::io::Result<SocketAddr> {
        tokio::net::lookup_host((host, port))
            .await?
            .next()
            .ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "no address returned")
            })
    }
}

/// Resolve a SOCKS5-style address to a concrete socket address, for a numeric IP this
/// is direct; for an FQDN it invokes `resolver.resolve` and takes the first result.
pub async fn resolve_addr(resolver: &dyn Resolver, addr: &Socks5Addr) -> Result<SocketAddr> {
    match addr {
        Socks5Addr::Ipv4(ip, port) => Ok(SocketAddr::new((*ip).into(), *port)),
        Socks5Addr::Ipv6(ip, port) => Ok(SocketAddr::new((*ip).into(), *port)),
        Socks5Addr::Domain(name, port) => resolver
            .resolve(name, *port)
            .await
            .map_err(|_| TrojanError::Resolve),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn numeric_ip_skips_resolver() {
        struct PanicResolver;
        #[async_trait]
        impl Resolver for PanicResolver {
            async fn resolve(&self, _: &str, _: u16) -> std::io::Result<SocketAddr> {
                panic!("resolver should not be invoked for numeric addresses")
            }
        }

        let addr = Socks5Addr::Ipv4(Ipv4Addr::new(127, 0, 0, 1), 8080);
        let resolved = resolve_addr(&PanicResolver, &addr).await.unwrap();
        assert_eq!(resolved, SocketAddr::from(([127, 0, 0, 1], 8080)));
    }

    #[tokio::test]
    async fn resolver_failure_is_err_resolve() {
        struct FailResolver;
        #[async_trait]
        impl Resolver for FailResolver {
            async fn resolve(&self, _: &str, _: u16) -> std::io::Result<SocketAddr> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "boom"))
            }
        }

        let addr = Socks5Addr::Domain("nonexistent.invalid".into(), 80);
        let err = resolve_addr(&FailResolver, &addr).await.unwrap_err();
        assert!(matches!(err, TrojanError::Resolve));
    }
}
