//! Configuration types and CLI/environment parsing for a silhouette-db
//! coordinator node.
//!
//! Concrete deployments may have a more detailed config and can use the
//! exposed [`CoordinatorConfig`] and flatten it with `#[clap(flatten)]`.

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use silhouette_types::Backend;

fn parse_backend(s: &str) -> Result<Backend, String> {
    s.parse().map_err(|_| format!("invalid backend `{s}`, expected `okvs` or `kvs`"))
}

/// The configuration for a single coordinator node.
///
/// It can be configured via environment variables or command line
/// arguments using `clap`.
#[derive(Parser, Debug, Clone)]
pub struct CoordinatorConfig {
    /// The address this node's HTTP API listens on.
    #[clap(long, env = "SILHOUETTE_LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen_addr: String,

    /// This node's identifier in the replicated log's voter set.
    #[clap(long, env = "SILHOUETTE_NODE_ID")]
    pub node_id: String,

    /// Whether this node should bootstrap a fresh, single-voter replicated
    /// log rather than joining an existing cluster.
    #[clap(long, env = "SILHOUETTE_BOOTSTRAP", default_value = "true")]
    pub bootstrap: bool,

    /// Peer node ids to add as voters once bootstrapped.
    #[clap(long, env = "SILHOUETTE_PEERS", value_delimiter = ',')]
    pub peers: Vec<String>,

    /// The sealing backend every round is encoded with. `Okvs` rejects
    /// rounds whose aggregated pair count is below the codec's minimum;
    /// `Kvs` accepts any size but is not oblivious.
    #[clap(
        long,
        env = "SILHOUETTE_BACKEND",
        default_value = "okvs",
        value_parser = parse_backend
    )]
    pub backend: Backend,

    /// Max time to wait for a replicated `Set` to commit during sealing.
    #[clap(
        long,
        env = "SILHOUETTE_COMMIT_TIMEOUT",
        default_value = "5s",
        value_parser = humantime::parse_duration
    )]
    pub commit_timeout: Duration,

    /// Directory used by the on-disk replicated log backend, if configured.
    #[clap(long, env = "SILHOUETTE_DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_args() {
        let config = CoordinatorConfig::parse_from(["coordinator", "--node-id", "n1"]);
        assert_eq!(config.node_id, "n1");
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert!(config.bootstrap);
        assert_eq!(config.backend, Backend::Okvs);
    }

    #[test]
    fn parses_kvs_backend() {
        let config = CoordinatorConfig::parse_from([
            "coordinator",
            "--node-id",
            "n1",
            "--backend",
            "kvs",
        ]);
        assert_eq!(config.backend, Backend::Kvs);
    }

    #[test]
    fn rejects_unknown_backend() {
        let result = CoordinatorConfig::try_parse_from([
            "coordinator",
            "--node-id",
            "n1",
            "--backend",
            "bogus",
        ]);
        assert!(result.is_err());
    }
}
