use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use portal_core::constants::DEFAULT_BIND_ADDR;
use portal_core::{FeedTarget, Identity, StaticWallet};

/// CLI configuration that can be loaded from a JSON file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PortalConfig {
    /// Ledger program, endpoint and feed account
    #[serde(default)]
    pub target: FeedTarget,

    /// Wallet the CLI acts as
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet: Option<WalletConfig>,

    #[serde(default)]
    pub server: ServerConfig,
}

/// Stand-in for the browser wallet extension
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletConfig {
    /// Public address
    pub address: String,

    /// Wallet already trusts this app (silent reconnect succeeds)
    #[serde(default)]
    pub trusted: bool,

    /// Approve interactive connection prompts
    #[serde(default = "default_true")]
    pub approve_prompts: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    pub bind: String,

    /// JSON file the ledger server persists its accounts to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND_ADDR.to_string(),
            state_file: None,
        }
    }
}

impl PortalConfig {
    /// Load config from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: PortalConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// `~/.config/portal/config.json` (platform equivalent)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("portal").join("config.json"))
    }

    /// Explicit path, else the default path if it exists, else defaults.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn with_endpoint(mut self, endpoint: Option<String>) -> Self {
        if let Some(endpoint) = endpoint {
            self.target.endpoint = endpoint;
        }
        self
    }

    /// Override the wallet address; a wallet given on the command line is
    /// treated as approving prompts.
    pub fn with_address(mut self, address: Option<String>) -> Self {
        if let Some(address) = address {
            match &mut self.wallet {
                Some(wallet) => wallet.address = address,
                None => {
                    self.wallet = Some(WalletConfig {
                        address,
                        trusted: false,
                        approve_prompts: true,
                    })
                }
            }
        }
        self
    }

    pub fn build_wallet(&self) -> Result<StaticWallet> {
        let Some(wallet) = &self.wallet else {
            return Ok(StaticWallet::absent());
        };
        let identity = Identity::parse(&wallet.address)
            .with_context(|| format!("Invalid wallet address in config: {:?}", wallet.address))?;
        Ok(StaticWallet::new(
            identity,
            wallet.trusted,
            wallet.approve_prompts,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_core::WalletProvider;

    #[test]
    fn test_parse_config_minimal() {
        let config: PortalConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.target, FeedTarget::default());
        assert!(config.wallet.is_none());
        assert_eq!(config.server.bind, DEFAULT_BIND_ADDR);
    }

    #[test]
    fn test_parse_config_with_wallet_and_target() {
        let json = r#"{
            "target": {
                "programId": "prog",
                "endpoint": "http://10.0.0.2:8899",
                "feedAccount": "feed"
            },
            "wallet": { "address": "7xKXtg2CW87d97TX", "trusted": true }
        }"#;
        let config: PortalConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.target.program_id, "prog");
        let wallet = config.wallet.as_ref().unwrap();
        assert!(wallet.trusted);
        assert!(wallet.approve_prompts);
        assert!(config.build_wallet().unwrap().detect());
    }

    #[test]
    fn test_overrides() {
        let config = PortalConfig::default()
            .with_endpoint(Some("http://elsewhere:1".to_string()))
            .with_address(Some("Abc".to_string()));
        assert_eq!(config.target.endpoint, "http://elsewhere:1");
        assert_eq!(config.wallet.unwrap().address, "Abc");
    }

    #[test]
    fn test_missing_wallet_builds_absent() {
        let wallet = PortalConfig::default().build_wallet().unwrap();
        assert!(!wallet.detect());
    }

    #[test]
    fn test_invalid_address_is_error() {
        let config = PortalConfig::default().with_address(Some("has space".to_string()));
        assert!(config.build_wallet().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"server": {"bind": "0.0.0.0:9000"}}"#).unwrap();
        let config = PortalConfig::resolve(Some(&path)).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:9000");

        assert!(PortalConfig::load(&dir.path().join("missing.json")).is_err());
    }
}
