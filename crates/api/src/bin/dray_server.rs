// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `dray-server`: the Dray pipeline orchestrator's HTTP entry point.
//!
//! Wires a Redis-backed [`dray_storage::RedisRepository`] and a
//! Docker-backed [`dray_executor::DockerExecutor`] into a
//! [`dray_engine::JobManager`], and serves the API router over it.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dray_api::{routes, AppState, Config};
use dray_core::SystemClock;
use dray_engine::JobManager;
use dray_executor::DockerExecutor;
use dray_storage::RedisRepository;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-v" => {
                println!("dray-server {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            _ => {}
        }
    }

    let config = Config::load();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .init();

    info!(redis_url = %config.redis_url, "connecting to repository backend");
    let repository = Arc::new(RedisRepository::connect(&config.redis_url).await?);

    info!(docker_host = %config.docker_host, "connecting to container driver");
    let executor = Arc::new(DockerExecutor::connect(&config.docker_host)?);

    let manager = JobManager::new(repository, executor, Arc::new(SystemClock));
    let state = AppState::new(manager);

    let app = routes::router(state).layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(%addr, "starting dray-server");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn print_help() {
    println!("dray-server {}", env!("CARGO_PKG_VERSION"));
    println!("HTTP API for the Dray pipeline orchestrator");
    println!();
    println!("USAGE:");
    println!("    dray-server [-p <port>]");
    println!();
    println!("OPTIONS:");
    println!("    -p <port>        Listening port (default 3000)");
    println!("    -h, --help       Print help information");
    println!("    -v, --version    Print version information");
    println!();
    println!("ENVIRONMENT:");
    println!("    REDIS_PORT       Repository backend URL (host portion used)");
    println!("    DOCKER_HOST      Container driver endpoint (default unix:///var/run/docker.sock)");
    println!("    LOG_LEVEL        Log level (default info)");
}
