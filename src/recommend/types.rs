//! Scoring data model.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::cluster::Cluster;
use crate::error_handling::InputError;
use crate::geo::Coordinate;

/// A remote server the scorer may recommend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateServer {
    pub identifier: String,
    /// `None` when the server's location is unknown; such servers are never ranked
    pub coordinate: Option<Coordinate>,
    /// Utilisation in [0, 1]
    pub load: f64,
    pub capabilities: BTreeSet<String>,
}

impl CandidateServer {
    /// Rejects a load outside [0, 1].
    pub fn new(
        identifier: impl Into<String>,
        coordinate: Option<Coordinate>,
        load: f64,
    ) -> Result<Self, InputError> {
        let server = CandidateServer {
            identifier: identifier.into(),
            coordinate,
            load,
            capabilities: BTreeSet::new(),
        };
        server.validate()?;
        Ok(server)
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.insert(capability.into());
        self
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    pub(crate) fn validate(&self) -> Result<(), InputError> {
        if (0.0..=1.0).contains(&self.load) {
            Ok(())
        } else {
            Err(InputError::InvalidLoad {
                server: self.identifier.clone(),
                load: self.load,
            })
        }
    }
}

/// One ranked (cluster, server) pairing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub cluster: Cluster,
    pub server: CandidateServer,
    /// Great-circle distance from the cluster centroid to the server
    pub distance_km: f64,
    pub score: f64,
    /// 1 for the best candidate of its cluster
    pub rank: usize,
}
