//! Candidate-server supply.
//!
//! Reads the ProtonVPN-style server list (from a file or a URL) and narrows it
//! to servers that are online and carry a required capability.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::geo::Coordinate;
use crate::recommend::CandidateServer;

/// Capability name for servers advertising P2P support.
pub const P2P_CAPABILITY: &str = "p2p";

const STATUS_ONLINE: i64 = 1;

#[derive(Debug, Deserialize)]
struct ServerRecord {
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Country", default)]
    country: Option<String>,
    #[serde(rename = "City", default)]
    city: Option<String>,
    #[serde(rename = "Latitude", default)]
    latitude: Option<f64>,
    #[serde(rename = "Longitude", default)]
    longitude: Option<f64>,
    /// Percent, 0 to 100
    #[serde(rename = "Load", default)]
    load: Option<f64>,
    #[serde(rename = "Status", default = "online")]
    status: i64,
    #[serde(rename = "P2P Feature Enabled", default)]
    p2p: bool,
    #[serde(rename = "Features", default)]
    features: Option<serde_json::Value>,
}

fn online() -> i64 {
    STATUS_ONLINE
}

/// One parsed list entry and whether it is currently online.
#[derive(Debug, Clone, PartialEq)]
pub struct ListedServer {
    pub candidate: CandidateServer,
    pub online: bool,
}

impl ServerRecord {
    fn into_listed(self) -> Option<ListedServer> {
        if self.name.is_empty() {
            return None;
        }

        let coordinate = match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => match Coordinate::new(lat, lon) {
                Ok(c) => Some(c.with_place(self.country, self.city)),
                Err(e) => {
                    log::debug!("Server {} has an unusable location: {}", self.name, e);
                    None
                }
            },
            _ => None,
        };

        let percent = self.load.filter(|l| l.is_finite()).unwrap_or(0.0);
        let load = (percent / 100.0).clamp(0.0, 1.0);

        let mut candidate = CandidateServer {
            identifier: self.name,
            coordinate,
            load,
            capabilities: Default::default(),
        };
        if self.p2p {
            candidate.capabilities.insert(P2P_CAPABILITY.to_string());
        }
        if let Some(serde_json::Value::Array(features)) = self.features {
            for feature in features.iter().filter_map(|f| f.as_str()) {
                candidate.capabilities.insert(feature.to_ascii_lowercase());
            }
        }

        Some(ListedServer {
            candidate,
            online: self.status == STATUS_ONLINE,
        })
    }
}

/// Parses a server list. Entries without a name are dropped.
pub fn parse_server_list(json: &str) -> Result<Vec<ListedServer>> {
    let records: Vec<ServerRecord> =
        serde_json::from_str(json).context("Failed to parse server list")?;
    Ok(records
        .into_iter()
        .filter_map(ServerRecord::into_listed)
        .collect())
}

/// Reads a server list from disk.
pub fn load_servers_from_file(path: &Path) -> Result<Vec<ListedServer>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read server list {}", path.display()))?;
    parse_server_list(&content)
}

/// Downloads a server list.
pub async fn fetch_servers(client: &reqwest::Client, url: &str) -> Result<Vec<ListedServer>> {
    let body = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to fetch server list from {}", url))?
        .error_for_status()
        .context("Server list request was refused")?
        .text()
        .await
        .context("Failed to read server list body")?;
    parse_server_list(&body)
}

/// Online servers carrying `capability`, in list order.
pub fn filter_eligible(servers: &[ListedServer], capability: &str) -> Vec<CandidateServer> {
    servers
        .iter()
        .filter(|s| s.online && s.candidate.has_capability(capability))
        .map(|s| s.candidate.clone())
        .collect()
}
