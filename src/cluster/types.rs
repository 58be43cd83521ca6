//! Clustering data model.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error_handling::InputError;
use crate::geo::Coordinate;

/// Peer supply: address to connection count.
pub type PeerCounts = BTreeMap<String, u32>;

/// One address's resolved location and its peer count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightedPoint {
    pub address: String,
    pub coordinate: Coordinate,
    pub weight: u32,
}

impl WeightedPoint {
    /// Rejects a zero weight.
    pub fn new(
        address: impl Into<String>,
        coordinate: Coordinate,
        weight: u32,
    ) -> Result<Self, InputError> {
        let address = address.into();
        if weight == 0 {
            return Err(InputError::InvalidWeight { address, weight });
        }
        Ok(WeightedPoint {
            address,
            coordinate,
            weight,
        })
    }
}

/// A weighted group of points and its weight-averaged centre.
///
/// Built once by the clusterer and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cluster {
    centroid: Coordinate,
    total_weight: u64,
    members: Vec<WeightedPoint>,
}

impl Cluster {
    pub(crate) fn new(centroid: Coordinate, members: Vec<WeightedPoint>) -> Self {
        let total_weight = members.iter().map(|p| u64::from(p.weight)).sum();
        Cluster {
            centroid,
            total_weight,
            members,
        }
    }

    pub fn centroid(&self) -> &Coordinate {
        &self.centroid
    }

    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    /// Members in ascending address order.
    pub fn members(&self) -> &[WeightedPoint] {
        &self.members
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_weight_rejected() {
        let coordinate = Coordinate::new(1.0, 2.0).unwrap();
        let err = WeightedPoint::new("1.1.1.1", coordinate, 0).unwrap_err();
        assert_eq!(
            err,
            InputError::InvalidWeight {
                address: "1.1.1.1".to_string(),
                weight: 0
            }
        );
    }

    #[test]
    fn test_cluster_sums_member_weights() {
        let at = |lat| Coordinate::new(lat, 0.0).unwrap();
        let members = vec![
            WeightedPoint::new("1.1.1.1", at(1.0), 3).unwrap(),
            WeightedPoint::new("2.2.2.2", at(2.0), u32::MAX).unwrap(),
        ];
        let cluster = Cluster::new(at(1.5), members);
        assert_eq!(cluster.total_weight(), 3 + u64::from(u32::MAX));
        assert_eq!(cluster.members().len(), 2);
    }
}
