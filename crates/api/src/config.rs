// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment/flag access for the `dray-server` binary.

/// Resolved server configuration: the listening port, the repository and
/// container-driver endpoints, and the log level. Loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub redis_url: String,
    pub docker_host: String,
    pub log_level: String,
}

impl Config {
    /// Resolve configuration from CLI flags and environment variables:
    /// `-p` for the port (default 3000), `REDIS_PORT` for the repository
    /// backend, `DOCKER_HOST` for the container driver, `LOG_LEVEL` for the
    /// tracing filter.
    pub fn load() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self {
            port: port_flag(&args).unwrap_or(3000),
            redis_url: std::env::var("REDIS_PORT")
                .ok()
                .map(|raw| redis_url_from_legacy(&raw))
                .unwrap_or_else(|| "redis://127.0.0.1:6379".to_string()),
            docker_host: std::env::var("DOCKER_HOST")
                .unwrap_or_else(|_| "unix:///var/run/docker.sock".to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        }
    }
}

/// Parse a `-p <port>` pair out of the raw argument list.
fn port_flag(args: &[String]) -> Option<u16> {
    args.iter()
        .position(|a| a == "-p")
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}

/// `REDIS_PORT` carries a Docker-links-style URL (e.g. `tcp://172.17.0.2:6379`)
/// rather than a bare port, a historical naming artifact this workspace keeps
/// compatible with; only the host portion is meaningful, the standard Redis
/// port and scheme are always used.
fn redis_url_from_legacy(raw: &str) -> String {
    let after_scheme = raw.rsplit("://").next().unwrap_or(raw);
    let host = after_scheme.split(':').next().unwrap_or("127.0.0.1");
    let host = if host.is_empty() { "127.0.0.1" } else { host };
    format!("redis://{host}:6379")
}
