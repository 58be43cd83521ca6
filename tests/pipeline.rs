//! End-to-end analysis runs with in-memory providers.
//!
//! Exercises resolve → cluster → recommend through `run_analysis`, the same
//! entry point the binary uses, without touching the network.

mod helpers;

use std::sync::Arc;

use peer_cluster::sources::{filter_eligible, parse_server_list};
use peer_cluster::{run_analysis, AddressResolver, CandidateServer, Config, PeerCounts};

use helpers::{berlin, fast_config, new_york, paris, StaticProvider};

fn peers(entries: &[(&str, u32)]) -> PeerCounts {
    entries
        .iter()
        .map(|(address, count)| (address.to_string(), *count))
        .collect()
}

fn candidates() -> Vec<CandidateServer> {
    vec![
        CandidateServer::new("DE#1", Some(berlin()), 0.2).unwrap(),
        CandidateServer::new("FR#1", Some(paris()), 0.2).unwrap(),
    ]
}

#[tokio::test]
async fn test_two_cities_get_their_nearest_server() {
    let primary = StaticProvider::new("primary", 100)
        .with("1.1.1.1", paris())
        .with("2.2.2.2", berlin())
        .shared();
    let resolver = AddressResolver::new(primary, vec![], fast_config()).unwrap();
    let config = Config {
        clusters: 2,
        no_reference: true,
        ..Default::default()
    };

    let report = run_analysis(
        &config,
        &resolver,
        &peers(&[("1.1.1.1", 10), ("2.2.2.2", 5)]),
        &candidates(),
    )
    .await
    .unwrap();

    assert_eq!(report.total_connections, 15);
    assert_eq!(report.resolved_addresses, 2);
    assert_eq!(report.clusters.len(), 2);
    assert_eq!(report.clusters[0].total_weight(), 10);
    assert_eq!(report.clusters[1].total_weight(), 5);
    assert_eq!(report.reference_location, None);
    assert!(!report.cancelled);

    let pairs: Vec<(u64, &str)> = report
        .recommendations
        .iter()
        .map(|r| (r.cluster.total_weight(), r.server.identifier.as_str()))
        .collect();
    assert_eq!(pairs, vec![(10, "FR#1"), (5, "DE#1")]);
    assert!(report.recommendations.iter().all(|r| r.distance_km < 1.0));
    assert_eq!(report.best_overall().unwrap().server.identifier, "FR#1");
}

#[tokio::test]
async fn test_reference_location_is_looked_up() {
    let primary = StaticProvider::new("primary", 100)
        .with("1.1.1.1", new_york())
        .with_own(berlin())
        .shared();
    let resolver = AddressResolver::new(primary, vec![], fast_config()).unwrap();
    let config = Config {
        clusters: 1,
        ..Default::default()
    };

    let report = run_analysis(&config, &resolver, &peers(&[("1.1.1.1", 3)]), &candidates())
        .await
        .unwrap();

    assert_eq!(
        report.reference_location.as_ref().and_then(|c| c.city()),
        Some("Berlin")
    );
    assert_eq!(report.recommendations.len(), 1);
}

#[tokio::test]
async fn test_nothing_resolvable_gives_empty_report() {
    let primary = Arc::new(StaticProvider::new("primary", 100));
    let resolver = AddressResolver::new(primary, vec![], fast_config()).unwrap();
    let config = Config {
        no_reference: true,
        ..Default::default()
    };

    let report = run_analysis(
        &config,
        &resolver,
        &peers(&[("192.0.2.1", 4), ("192.0.2.2", 1)]),
        &candidates(),
    )
    .await
    .unwrap();

    assert!(!report.has_locations());
    assert!(report.clusters.is_empty());
    assert!(report.recommendations.is_empty());
    assert_eq!(report.unique_addresses, 2);
}

#[tokio::test]
async fn test_invalid_settings_rejected_before_lookup() {
    let primary = StaticProvider::new("primary", 100)
        .with("1.1.1.1", paris())
        .shared();
    let resolver = AddressResolver::new(primary.clone(), vec![], fast_config()).unwrap();

    let zero_clusters = Config {
        clusters: 0,
        ..Default::default()
    };
    let result = run_analysis(&zero_clusters, &resolver, &peers(&[("1.1.1.1", 1)]), &[]).await;
    assert!(result.is_err());

    let bad_penalty = Config {
        load_penalty: 1.5,
        ..Default::default()
    };
    let result = run_analysis(&bad_penalty, &resolver, &peers(&[("1.1.1.1", 1)]), &[]).await;
    assert!(result.is_err());
    assert_eq!(primary.calls(), 0);
}

#[tokio::test]
async fn test_zero_peer_count_is_rejected() {
    let primary = StaticProvider::new("primary", 100)
        .with("1.1.1.1", paris())
        .shared();
    let resolver = AddressResolver::new(primary, vec![], fast_config()).unwrap();
    let config = Config {
        no_reference: true,
        ..Default::default()
    };

    let err = run_analysis(&config, &resolver, &peers(&[("1.1.1.1", 0)]), &[])
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("must be a positive integer"));
}

#[tokio::test]
async fn test_server_list_feeds_recommendations() {
    let list = r#"[
        {"Name": "FR#9", "Country": "France", "City": "Paris",
         "Latitude": 48.86, "Longitude": 2.35, "P2P Feature Enabled": true, "Load": 90},
        {"Name": "FR#10", "Latitude": 48.86, "Longitude": 2.35,
         "P2P Feature Enabled": false, "Load": 0},
        {"Name": "DE#9", "Latitude": 52.52, "Longitude": 13.40,
         "P2P Feature Enabled": true, "Load": 10, "Status": 0}
    ]"#;
    let eligible = filter_eligible(&parse_server_list(list).unwrap(), "p2p");

    let primary = StaticProvider::new("primary", 100)
        .with("1.1.1.1", paris())
        .shared();
    let resolver = AddressResolver::new(primary, vec![], fast_config()).unwrap();
    let config = Config {
        clusters: 1,
        no_reference: true,
        top_n: 3,
        ..Default::default()
    };

    let report = run_analysis(&config, &resolver, &peers(&[("1.1.1.1", 2)]), &eligible)
        .await
        .unwrap();

    assert_eq!(report.candidates_considered, 1);
    assert_eq!(report.recommendations.len(), 1);
    assert_eq!(report.recommendations[0].server.identifier, "FR#9");
    assert_eq!(report.recommendations[0].rank, 1);
}
