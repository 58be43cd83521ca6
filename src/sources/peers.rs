//! Peer supply: qBittorrent Web API or a JSON file.

use std::collections::HashMap;
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use url::Url;

use crate::cluster::PeerCounts;
use crate::config::PEER_FETCH_CONCURRENCY;

#[derive(Debug, Deserialize)]
struct TorrentInfo {
    hash: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct TorrentPeers {
    #[serde(default)]
    peers: HashMap<String, PeerInfo>,
}

#[derive(Debug, Deserialize)]
struct PeerInfo {
    #[serde(default)]
    ip: String,
}

/// Minimal qBittorrent Web API client.
///
/// Holds its own cookie-backed HTTP client for the `SID` session.
pub struct QbittorrentClient {
    client: reqwest::Client,
    base_url: Url,
    username: String,
    password: String,
}

impl QbittorrentClient {
    pub fn new(base_url: &str, username: &str, password: &str, timeout: Duration) -> Result<Self> {
        let mut base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid qBittorrent URL: {}", base_url))?;
        // Endpoints are joined relative to the base path
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .context("Failed to build qBittorrent HTTP client")?;

        Ok(QbittorrentClient {
            client,
            base_url,
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("Invalid qBittorrent endpoint {}", path))
    }

    /// Opens a session. A rejected login is an error.
    pub async fn login(&self) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint("api/v2/auth/login")?)
            .header(reqwest::header::REFERER, self.base_url.as_str())
            .form(&[("username", &self.username), ("password", &self.password)])
            .send()
            .await
            .context("Failed to reach qBittorrent")?;

        let status = response.status();
        if status == reqwest::StatusCode::FORBIDDEN {
            bail!("qBittorrent refused the login (too many failed attempts)");
        }
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() || body.trim() == "Fails." {
            bail!("qBittorrent rejected the login for user {}", self.username);
        }

        log::debug!("Logged in to qBittorrent at {}", self.base_url);
        Ok(())
    }

    /// Closes the session.
    pub async fn logout(&self) -> Result<()> {
        self.client
            .post(self.endpoint("api/v2/auth/logout")?)
            .header(reqwest::header::REFERER, self.base_url.as_str())
            .send()
            .await
            .context("Failed to log out of qBittorrent")?
            .error_for_status()
            .context("qBittorrent rejected the logout")?;
        Ok(())
    }

    async fn torrents(&self) -> Result<Vec<TorrentInfo>> {
        self.client
            .get(self.endpoint("api/v2/torrents/info")?)
            .send()
            .await
            .context("Failed to list torrents")?
            .error_for_status()
            .context("qBittorrent refused the torrent list")?
            .json()
            .await
            .context("Failed to parse torrent list")
    }

    async fn torrent_peers(&self, hash: &str) -> Result<Vec<String>> {
        let peers: TorrentPeers = self
            .client
            .get(self.endpoint("api/v2/sync/torrentPeers")?)
            .query(&[("hash", hash), ("rid", "0")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(peers.peers.into_values().map(|p| p.ip).collect())
    }

    /// Counts connected peers per address across every torrent.
    ///
    /// Logs in, walks the torrents, then logs out. A torrent whose peer list
    /// cannot be fetched is skipped with a warning.
    pub async fn fetch_peer_counts(&self) -> Result<PeerCounts> {
        self.login().await?;
        let counts = self.collect_peer_counts().await;
        if let Err(e) = self.logout().await {
            log::warn!("{:#}", e);
        }
        counts
    }

    async fn collect_peer_counts(&self) -> Result<PeerCounts> {
        let torrents = self.torrents().await?;
        log::info!("Fetching peers for {} torrents", torrents.len());

        let lists: Vec<(TorrentInfo, Result<Vec<String>>)> = stream::iter(torrents)
            .map(|torrent| async move {
                let peers = self.torrent_peers(&torrent.hash).await;
                (torrent, peers)
            })
            .buffer_unordered(PEER_FETCH_CONCURRENCY)
            .collect()
            .await;

        let mut counts = PeerCounts::new();
        for (torrent, peers) in lists {
            match peers {
                Ok(addresses) => {
                    for address in addresses {
                        add_peer(&mut counts, address);
                    }
                }
                Err(e) => log::warn!(
                    "Failed to fetch peers for torrent {}: {:#}",
                    if torrent.name.is_empty() {
                        &torrent.hash
                    } else {
                        &torrent.name
                    },
                    e
                ),
            }
        }
        Ok(counts)
    }
}

fn add_peer(counts: &mut PeerCounts, address: String) {
    if address.is_empty() {
        return;
    }
    if address.parse::<IpAddr>().is_err() {
        log::debug!("Skipping peer with unparseable address {:?}", address);
        return;
    }
    *counts.entry(address).or_insert(0) += 1;
}

/// Reads `{address: count}` JSON.
pub fn load_peer_file(path: &Path) -> Result<PeerCounts> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read peer file {}", path.display()))?;
    let counts: PeerCounts = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse peer file {}", path.display()))?;
    Ok(counts)
}
