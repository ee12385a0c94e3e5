// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2022 irohaede <irohaede@proton.me>

use std::fs::File;
use std::io;
use std::sync::Arc;

use trojan_server::config::Config;
use trojan_server::server;

fn main() {
    unsafe { simple_logger::init().unwrap_unchecked() };

    log::info!("trojan-server v0.1.0, licensed under MPL-2.0");

    let path = match std::env::args().nth(1) {
        Some(p) => p,
        None => {
            log::warn!("no config file path provided, using config.json");
            String::from("config.json")
        }
    };

    if let Err(e) = run_with_path(&path) {
        log::error!("exited unexpectedly: {}", e);
    }
}

fn run_with_path(path: &str) -> io::Result<()> {
    let file = File::open(path)?;
    let cfg: Config = serde_json::from_reader(file)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    log::set_max_level(cfg.log_level);

    let ctx = Arc::new(server::context_from_config(&cfg)?);
    let listen = cfg.listen;

    let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    rt.spawn(async move {
        if let Err(e) = server::run(listen, ctx).await {
            log::error!("server fatal: {}", e);
        }
    });

    rt.block_on(tokio::signal::ctrl_c())?;
    log::info!("SIGINT received, exiting...");

    Ok(())
}
