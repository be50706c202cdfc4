//! Miner configuration.
//!
//! Credentials and tuning are plain values handed to whoever needs them;
//! nothing here is global.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::coinbase::Script;
use crate::error::{MinerError, Result};
use crate::network::Network;

/// Coinbase scriptSig of the genesis block, used when none is configured.
pub const DEFAULT_SCRIPT_SIG: &str = "04ffff001d0104455468652054696d65732030332f4a616e2f32303039204368616e63656c6c6f72206f6e206272696e6b206f66207365636f6e64206261696c6f757420666f722062616e6b73";

/// Nonces per batch when mining incrementally.
pub const DEFAULT_BATCH_SIZE: u32 = 1 << 20;

/// Connection details for the node that serves templates and takes blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub network: Network,
    pub rpc_host: String,
    /// Falls back to the network's default port.
    pub rpc_port: Option<u16>,
    pub rpc_user: String,
    pub rpc_password: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            network: Network::default(),
            rpc_host: "127.0.0.1".to_string(),
            rpc_port: None,
            rpc_user: String::new(),
            rpc_password: String::new(),
        }
    }
}

impl NodeConfig {
    pub fn port(&self) -> u16 {
        self.rpc_port.unwrap_or_else(|| self.network.default_rpc_port())
    }

    /// RPC endpoint without credentials.
    pub fn rpc_url(&self) -> String {
        format!("http://{}:{}", self.rpc_host, self.port())
    }
}

/// Everything a mining attempt needs besides chain state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinerConfig {
    pub node: NodeConfig,
    /// Hex of the coinbase input script.
    pub script_sig: String,
    /// Search threads; 0 picks one per CPU.
    pub workers: usize,
    /// Nonces searched between progress reports.
    pub batch_size: u32,
}

impl Default for MinerConfig {
    fn default() -> Self {
        MinerConfig {
            node: NodeConfig::default(),
            script_sig: DEFAULT_SCRIPT_SIG.to_string(),
            workers: 0,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl MinerConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: MinerConfig =
            serde_json::from_str(json).map_err(|e| MinerError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| MinerError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        self.script_sig()?;
        if self.batch_size == 0 {
            return Err(MinerError::InvalidConfig("batch_size must be positive".to_string()));
        }
        if self.node.rpc_host.is_empty() {
            return Err(MinerError::InvalidConfig("rpc_host must not be empty".to_string()));
        }
        Ok(())
    }

    /// The decoded coinbase input script.
    pub fn script_sig(&self) -> Result<Script> {
        Script::from_hex(&self.script_sig)
            .map_err(|e| MinerError::InvalidConfig(format!("script_sig: {}", e)))
    }
}
