use eyre::{eyre, Result, WrapErr};
use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::Path;

/// Main configuration for the relayer
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub ethereum: EthereumConfig,
    pub cosmos: CosmosConfig,
    pub relayer: RelayerConfig,
}

/// Ethereum chain configuration
#[derive(Clone, Deserialize)]
pub struct EthereumConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    /// BridgeRegistry contract; the remaining contract addresses are
    /// resolved from it at startup.
    pub bridge_registry_address: String,
    pub private_key: String,
}

/// Custom Debug that redacts private_key to prevent accidental log leakage.
impl fmt::Debug for EthereumConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EthereumConfig")
            .field("rpc_url", &self.rpc_url)
            .field("chain_id", &self.chain_id)
            .field("bridge_registry_address", &self.bridge_registry_address)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Cosmos chain configuration
#[derive(Clone, Deserialize)]
pub struct CosmosConfig {
    pub rpc_url: String,
    pub lcd_url: String,
    pub chain_id: String,
    #[serde(default = "default_account_prefix")]
    pub account_prefix: String,
    #[serde(default = "default_fee_denom")]
    pub fee_denom: String,
    #[serde(default = "default_gas_price")]
    pub gas_price: f64,
    pub mnemonic: String,
    /// Moniker of the validator this relayer submits claims for.
    pub validator_moniker: String,
}

/// Custom Debug that redacts mnemonic to prevent accidental log leakage.
impl fmt::Debug for CosmosConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CosmosConfig")
            .field("rpc_url", &self.rpc_url)
            .field("lcd_url", &self.lcd_url)
            .field("chain_id", &self.chain_id)
            .field("account_prefix", &self.account_prefix)
            .field("fee_denom", &self.fee_denom)
            .field("gas_price", &self.gas_price)
            .field("mnemonic", &"<redacted>")
            .field("validator_moniker", &self.validator_moniker)
            .finish()
    }
}

/// Relayer configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RelayerConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_token_prefix")]
    pub token_prefix: String,
}

/// Default functions
fn default_poll_interval() -> u64 {
    1000
}

fn default_retry_attempts() -> u32 {
    5
}

fn default_retry_delay() -> u64 {
    2000
}

fn default_account_prefix() -> String {
    "cosmos".to_string()
}

fn default_fee_denom() -> String {
    "stake".to_string()
}

fn default_gas_price() -> f64 {
    0.025
}

fn default_token_prefix() -> String {
    "peggy".to_string()
}

impl Config {
    /// Load configuration from environment variables
    /// Loads .env file if present, then reads from environment
    pub fn load() -> Result<Self> {
        Self::load_from_file(".env").or_else(|_| Self::load_from_env())
    }

    /// Load from a specific .env file path
    pub fn load_from_file(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            dotenvy::from_filename(path)
                .wrap_err_with(|| format!("Failed to load .env file from {}", path))?;
        }
        Self::load_from_env()
    }

    /// Load configuration from environment variables
    fn load_from_env() -> Result<Self> {
        let ethereum = EthereumConfig {
            rpc_url: env::var("ETHEREUM_RPC_URL")
                .map_err(|_| eyre!("ETHEREUM_RPC_URL environment variable is required"))?,
            chain_id: env::var("ETHEREUM_CHAIN_ID")
                .map_err(|_| eyre!("ETHEREUM_CHAIN_ID environment variable is required"))?
                .parse()
                .wrap_err("ETHEREUM_CHAIN_ID must be a valid u64")?,
            bridge_registry_address: env::var("BRIDGE_REGISTRY_ADDRESS")
                .map_err(|_| eyre!("BRIDGE_REGISTRY_ADDRESS environment variable is required"))?,
            private_key: env::var("ETHEREUM_PRIVATE_KEY")
                .map_err(|_| eyre!("ETHEREUM_PRIVATE_KEY environment variable is required"))?,
        };

        let cosmos = CosmosConfig {
            rpc_url: env::var("COSMOS_RPC_URL")
                .map_err(|_| eyre!("COSMOS_RPC_URL environment variable is required"))?,
            lcd_url: env::var("COSMOS_LCD_URL")
                .map_err(|_| eyre!("COSMOS_LCD_URL environment variable is required"))?,
            chain_id: env::var("COSMOS_CHAIN_ID")
                .map_err(|_| eyre!("COSMOS_CHAIN_ID environment variable is required"))?,
            account_prefix: env::var("COSMOS_ACCOUNT_PREFIX")
                .unwrap_or_else(|_| default_account_prefix()),
            fee_denom: env::var("COSMOS_FEE_DENOM").unwrap_or_else(|_| default_fee_denom()),
            gas_price: env::var("COSMOS_GAS_PRICE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default_gas_price()),
            mnemonic: env::var("VALIDATOR_MNEMONIC")
                .map_err(|_| eyre!("VALIDATOR_MNEMONIC environment variable is required"))?,
            validator_moniker: env::var("VALIDATOR_MONIKER")
                .map_err(|_| eyre!("VALIDATOR_MONIKER environment variable is required"))?,
        };

        let relayer = RelayerConfig {
            poll_interval_ms: env::var("POLL_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default_poll_interval()),
            retry_attempts: env::var("RETRY_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default_retry_attempts()),
            retry_delay_ms: env::var("RETRY_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default_retry_delay()),
            token_prefix: env::var("TOKEN_PREFIX").unwrap_or_else(|_| default_token_prefix()),
        };

        let config = Config {
            ethereum,
            cosmos,
            relayer,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        // Validate Ethereum RPC URL
        if self.ethereum.rpc_url.is_empty() {
            return Err(eyre!("ethereum.rpc_url cannot be empty"));
        }

        // Validate registry address
        if self.ethereum.bridge_registry_address.len() != 42
            || !self.ethereum.bridge_registry_address.starts_with("0x")
        {
            return Err(eyre!(
                "ethereum.bridge_registry_address must be a valid hex address (42 chars with 0x prefix)"
            ));
        }

        // Validate Ethereum private key
        if self.ethereum.private_key.len() != 66 || !self.ethereum.private_key.starts_with("0x") {
            return Err(eyre!(
                "ethereum.private_key must be 66 chars (0x + 64 hex chars)"
            ));
        }

        // Validate Cosmos endpoints
        if self.cosmos.rpc_url.is_empty() {
            return Err(eyre!("cosmos.rpc_url cannot be empty"));
        }
        if self.cosmos.lcd_url.is_empty() {
            return Err(eyre!("cosmos.lcd_url cannot be empty"));
        }
        if self.cosmos.chain_id.is_empty() {
            return Err(eyre!("cosmos.chain_id cannot be empty"));
        }
        if self.cosmos.account_prefix.is_empty() {
            return Err(eyre!("cosmos.account_prefix cannot be empty"));
        }

        // Validate mnemonic
        let mnemonic_words: Vec<&str> = self.cosmos.mnemonic.split_whitespace().collect();
        if mnemonic_words.len() < 12 {
            return Err(eyre!("cosmos.mnemonic must have at least 12 words"));
        }

        if self.cosmos.validator_moniker.is_empty() {
            return Err(eyre!("cosmos.validator_moniker cannot be empty"));
        }

        if self.cosmos.gas_price <= 0.0 {
            return Err(eyre!("cosmos.gas_price must be positive"));
        }

        if self.relayer.token_prefix.is_empty() {
            return Err(eyre!("relayer.token_prefix cannot be empty"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            ethereum: EthereumConfig {
                rpc_url: "http://localhost:8545".to_string(),
                chain_id: 5,
                bridge_registry_address: "0x0000000000000000000000000000000000000001".to_string(),
                private_key:
                    "0x0000000000000000000000000000000000000000000000000000000000000001"
                        .to_string(),
            },
            cosmos: CosmosConfig {
                rpc_url: "http://localhost:26657".to_string(),
                lcd_url: "http://localhost:1317".to_string(),
                chain_id: "prophecy-1".to_string(),
                account_prefix: "cosmos".to_string(),
                fee_denom: "stake".to_string(),
                gas_price: 0.025,
                mnemonic: "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about".to_string(),
                validator_moniker: "validator-1".to_string(),
            },
            relayer: RelayerConfig {
                poll_interval_ms: 1000,
                retry_attempts: 5,
                retry_delay_ms: 2000,
                token_prefix: "peggy".to_string(),
            },
        }
    }

    #[test]
    fn test_defaults() {
        assert_eq!(default_poll_interval(), 1000);
        assert_eq!(default_retry_attempts(), 5);
        assert_eq!(default_retry_delay(), 2000);
        assert_eq!(default_account_prefix(), "cosmos");
        assert_eq!(default_token_prefix(), "peggy");
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_registry_address_validation() {
        let mut config = valid_config();
        config.ethereum.bridge_registry_address = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_private_key_validation() {
        let mut config = valid_config();
        config.ethereum.private_key = "0x123".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_mnemonic_validation() {
        let mut config = valid_config();
        config.cosmos.mnemonic = "too few words".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_moniker_required() {
        let mut config = valid_config();
        config.cosmos.validator_moniker = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_secrets_redacted_in_debug() {
        let config = valid_config();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("abandon"));
        assert!(!debug.contains("0000000000000000000000000000000000000000000000000000000000000001"));
        assert!(debug.contains("<redacted>"));
    }
}
