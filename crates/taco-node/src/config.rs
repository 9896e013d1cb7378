//! Node configuration, loaded once at startup.

use serde::{Deserialize, Serialize};

/// Everything a node needs to know about itself and its operating
/// parameters. Loaded from a single TOML file; there is no CLI flag
/// layer here, that belongs to whatever binary embeds this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Hostname or IP this node advertises to peers.
    pub host: String,
    /// Port the REST surface listens on.
    pub port: u16,
    /// Network domain this node serves (e.g. `"mainnet"`, `"lynx"`).
    pub domain: String,
    /// Chain ids this node will read condition state from. A condition
    /// referencing any other chain is rejected before any RPC is made,
    /// per-node rather than a fixed network-wide list.
    pub allowed_chains: Vec<u64>,
    /// Whether `/reencrypt` and `/decrypt` require a confirmed payment
    /// before serving a request.
    #[serde(default = "default_true")]
    pub payment_required: bool,
    /// Path to the node's persisted signing/decrypting keystore. Loading
    /// and unlocking it is left to the embedding binary.
    pub keystore_path: String,
}

fn default_true() -> bool {
    true
}

impl NodeConfig {
    /// Parse a config from its TOML source.
    pub fn from_toml(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }
}
