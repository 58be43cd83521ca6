//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `peer_cluster` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - Choosing the peer and server sources
//! - Cache persistence and Ctrl-C
//!
//! All core functionality is implemented in the library crate.

use std::path::Path;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use peer_cluster::app::{cancel_on_ctrl_c, export_json, print_report};
use peer_cluster::geo::{load_cache_file, save_cache_file};
use peer_cluster::initialization::{init_client, init_logger_with};
use peer_cluster::sources::{
    fetch_servers, filter_eligible, load_peer_file, load_servers_from_file, QbittorrentClient,
};
use peer_cluster::{run_analysis, AddressResolver, CandidateServer, Config, PeerCounts};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (if it exists)
    // This allows setting QBT_PASSWORD in .env without exporting it manually
    // Try loading from current directory first, then from the executable's directory
    if dotenvy::dotenv().is_err() {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let env_path = exe_dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                }
            }
        }
    }

    let config = Config::parse();

    let log_level = config.log_level.clone();
    let log_format = config.log_format.clone();
    init_logger_with(log_level.into(), log_format).context("Failed to initialize logger")?;

    if let Err(e) = run(config).await {
        eprintln!("peer_cluster error: {:#}", e);
        process::exit(1);
    }
    Ok(())
}

async fn run(config: Config) -> Result<()> {
    let client = init_client(&config).context("Failed to initialize HTTP client")?;

    let peers = load_peers(&config).await?;
    if peers.is_empty() {
        log::warn!("No peers found");
        return Ok(());
    }
    log::info!("Found {} unique peer addresses", peers.len());

    let candidates = load_candidates(&config, &client).await?;
    log::info!(
        "{} eligible servers with capability {:?}",
        candidates.len(),
        config.capability
    );

    let cancel = CancellationToken::new();
    let watcher = cancel_on_ctrl_c(cancel.clone());
    let resolver = AddressResolver::from_config(&config, client, cancel.clone())
        .context("Invalid resolver settings")?;

    if let Some(path) = &config.cache_file {
        restore_cache(&resolver, path);
    }

    let outcome = run_analysis(&config, &resolver, &peers, &candidates).await;

    if let Some(path) = &config.cache_file {
        if let Err(e) = save_cache_file(path, resolver.export_cache()) {
            log::warn!("{:#}", e);
        }
    }
    // Stop the Ctrl-C watcher
    cancel.cancel();
    let _ = watcher.await;

    let report = outcome?;
    print_report(&report);
    if let Some(path) = &config.json_output {
        export_json(&report, path)?;
    }
    Ok(())
}

async fn load_peers(config: &Config) -> Result<PeerCounts> {
    if let Some(path) = &config.peers_file {
        return load_peer_file(path);
    }

    log::info!("Connecting to qBittorrent at {}", config.qbt_url);
    let qbittorrent = QbittorrentClient::new(
        &config.qbt_url,
        &config.qbt_username,
        config.qbt_password.as_deref().unwrap_or_default(),
        Duration::from_secs(config.timeout_seconds.max(1) * 2),
    )?;
    qbittorrent.fetch_peer_counts().await
}

async fn load_candidates(
    config: &Config,
    client: &Arc<reqwest::Client>,
) -> Result<Vec<CandidateServer>> {
    let servers = match &config.servers_file {
        Some(path) => load_servers_from_file(path)?,
        None => {
            log::info!("Fetching server list from {}", config.servers_url);
            fetch_servers(client, &config.servers_url).await?
        }
    };
    Ok(filter_eligible(&servers, &config.capability))
}

fn restore_cache(resolver: &AddressResolver, path: &Path) {
    match load_cache_file(path) {
        Ok(entries) => {
            let restored = resolver.import_cache(entries);
            log::info!("Restored {} cached resolutions from {}", restored, path.display());
        }
        Err(e) => log::warn!("Ignoring cache file {}: {:#}", path.display(), e),
    }
}
