// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Build Agent Service
//!
//! Runs the periodic health check of a build host:
//!
//! - Removes build directories of tasks the coordinator reports finished
//! - Empties configured scratch paths and prunes container state while no
//!   task assigned to this agent is running

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;

use build_agent::{ActiveTasks, AgentConfig, HealthCheck};
use coordinator_client::CoordinatorClient;

fn print_version() {
    let version = env!("CARGO_PKG_VERSION");
    let name = env!("CARGO_PKG_NAME");
    let buildstamp = option_env!("STAMP").unwrap_or("no-STAMP");
    println!("{} {} ({})", name, version, buildstamp);
}

fn print_usage(program: &str) {
    print_version();
    println!("Usage: {} [OPTIONS]", program);
    println!();
    println!("Options:");
    println!("  -h, --help                   Display this information");
    println!("  -V, --version                Display the program's version number");
    println!();
    println!("Environment variables:");
    println!("  AGENT_CONFIG                 JSON config file used instead of the variables below");
    println!("  COORDINATOR_URL              Coordinator base URL (required)");
    println!("  AGENT_KEY                    Key identifying this agent (required)");
    println!("  API_TOKEN                    Coordinator API token");
    println!("  TLS_CA_FILE                  Extra PEM CA bundle to trust");
    println!("  CLIENT_TIMEOUT_SECS          Request timeout, 0 for none (default: 30)");
    println!("  UPLOAD_CHUNK_SIZE            Upload read size in bytes (default: 65536)");
    println!("  UPLOAD_RATE_LIMIT_KIB        Upload bandwidth cap in KiB/s, 0 for none");
    println!("  BUILD_PATH                   Build root (default: /srv/build)");
    println!("  HEALTH_CHECK_INTERVAL_SECS   Seconds between health checks (default: 300)");
    println!("  HEALTH_CHECK_CLEAN_PATHS     Comma-separated directories to empty");
    println!("  PRUNE_COMMAND                Container prune command, empty to disable");
    println!("  RUST_LOG                     Log filter (default: build_agent=info,coordinator_client=info)");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Handle --version and --help
    let args: Vec<String> = std::env::args().collect();
    #[allow(clippy::never_loop)] // Intentional: early return on first recognized arg
    for arg in &args[1..] {
        match arg.as_str() {
            "-V" | "--version" => {
                print_version();
                return Ok(());
            }
            "-h" | "--help" => {
                print_usage(&args[0]);
                return Ok(());
            }
            _ => {
                eprintln!("Unknown option: {}", arg);
                std::process::exit(1);
            }
        }
    }

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "build_agent=info,coordinator_client=info".to_string()),
        ))
        .init();

    print_version();

    let config = AgentConfig::load().await.context("Failed to load configuration")?;
    info!(
        coordinator = %config.coordinator_url,
        build_path = %config.build_path.display(),
        "Configuration loaded"
    );

    let client = CoordinatorClient::new(config.client_config())
        .context("Failed to create coordinator client")?;

    let health = HealthCheck::new(Arc::new(client), ActiveTasks::new(), &config);

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
        }
        shutdown.cancel();
    });

    health.run(cancel).await;
    Ok(())
}
