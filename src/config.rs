// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2022 irohaede <irohaede@proton.me>

//! On-disk configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Top-level config file shape, loaded once at startup from the path given as the
/// process's first argument (`config.json` if none is given).
#[derive(serde::Deserialize)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: log::LevelFilter,

    pub listen: SocketAddr,
    pub password: String,
    pub cert: PathBuf,
    pub key: PathBuf,
}

fn default_log_level() -> log::LevelFilter {
    log::LevelFilter::Info
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config() {
        let json = r#"{
            "listen": "0.0.0.0:443",
            "password": "hunter2",
            "cert": "cert.pem",
            "key": "key.pem"
        }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.listen, SocketAddr::from(([0, 0, 0, 0], 443)));
        assert_eq!(cfg.password, "hunter2");
        assert_eq!(cfg.log_level, log::LevelFilter::Info);
    }

    #[test]
    fn honors_explicit_log_level() {
        let json = r#"{
            "log_level": "debug",
            "listen": "127.0.0.1:1080",
            "password": "x",
            "cert": "c",
            "key": "k"
        }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.log_level, log::LevelFilter::Debug);
    }
}
