//! Data sources feeding the pipeline: peer counts and candidate servers.

pub mod peers;
pub mod servers;

pub use peers::{load_peer_file, QbittorrentClient};
pub use servers::{
    fetch_servers, filter_eligible, load_servers_from_file, parse_server_list, ListedServer,
    P2P_CAPABILITY,
};
