// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2022 irohaede <irohaede@proton.me>

//! TLS setup and the TCP accept loop.

use std::fs::File;
use std::io::{self, BufReader};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::rustls::{Certificate, PrivateKey, ServerConfig};
use tokio_rustls::TlsAcceptor;

use crate::config::Config;
use crate::password::sha224_hex;
use crate::resolver::{Resolver, TokioResolver};
use crate::session;

/// How long the TLS handshake and the trojan request read together may take before
/// the connection is dropped.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared, read-only state handed to every accepted connection.
pub struct ServerContext {
    pub acceptor: TlsAcceptor,
    pub password_hash: [u8; 56],
    pub resolver: Arc<dyn Resolver>,
}

impl ServerContext {
    pub fn new(tls: Arc<ServerConfig>, password: &str) -> ServerContext {
        ServerContext {
            acceptor: TlsAcceptor::from(tls),
            password_hash: sha224_hex(password.as_bytes()),
            resolver: Arc::new(TokioResolver),
        }
    }
}

/// Build a single-certificate rustls server config from PEM files on disk. rustls
/// never negotiates below TLS 1.2, so the disabled-protocol requirement is satisfied
/// by construction.
pub fn load_tls_config(cert_path: &Path, key_path: &Path) -> io::Result<Arc<ServerConfig>> {
    let cert_file = File::open(cert_path)?;
    let cert: Vec<Certificate> = rustls_pemfile::certs(&mut BufReader::new(cert_file))
        .map(|x| x.into_iter().map(Certificate).collect())?;
    if cert.is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "empty certificate chain"));
    }

    let key_file = File::open(key_path)?;
    let key = rustls_pemfile::pkcs8_private_keys(&mut BufReader::new(key_file))?
        .pop()
        .map(PrivateKey)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "empty private key"))?;

    let config = ServerConfig::builder()
        .with_safe_defaults()
        .with_no_client_auth()
        .with_single_cert(cert, key)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    Ok(Arc::new(config))
}

pub fn context_from_config(cfg: &Config) -> io::Result<ServerContext> {
    let tls = load_tls_config(&cfg.cert, &cfg.key)?;
    Ok(ServerContext::new(tls, &cfg.password))
}

/// Accept loop: one task per connection, detached — a single bad peer never blocks
/// the next `accept`.
pub async fn run(bind: SocketAddr, ctx: Arc<ServerContext>) -> io::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    log::info!("listening on {}/tcp", bind);

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(x) => x,
            Err(e) => {
                log::error!("tcp accept: {}", e);
                continue;
            }
        };

        let ctx = ctx.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer, ctx).await {
                log::warn!("{}: {}", peer, e);
            }
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    ctx: Arc<ServerContext>,
) -> io::Result<()> {
    let _ = stream.set_nodelay(true);

    let accept = ctx.acceptor.accept(stream);
    let tls_stream = tokio::time::timeout(HANDSHAKE_TIMEOUT, accept)
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "tls handshake timed out"))??;

    if let Err(e) = session::handle(tls_stream, &ctx).await {
        log::error!("{}: {}", peer, e);
    }
    Ok(())
}
