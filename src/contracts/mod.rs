pub mod bridge;

pub use bridge::{BridgeBank, BridgeRegistry, CosmosBridge, Oracle};

use alloy::primitives::Address;
use alloy::providers::ProviderBuilder;
use eyre::{Result, WrapErr};
use std::str::FromStr;

/// Bridge contract addresses resolved from the registry.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedContracts {
    pub bridge_bank: Address,
    pub cosmos_bridge: Address,
    pub oracle: Address,
}

/// Query the BridgeRegistry once at startup for the deployed contract
/// addresses.
pub async fn resolve_contracts(rpc_url: &str, registry_address: &str) -> Result<ResolvedContracts> {
    let provider = ProviderBuilder::new().on_http(rpc_url.parse().wrap_err("Invalid RPC URL")?);
    let registry_address =
        Address::from_str(registry_address).wrap_err("Invalid registry address")?;
    let registry = BridgeRegistry::new(registry_address, &provider);

    let bridge_bank = registry
        .bridgeBank()
        .call()
        .await
        .wrap_err("Failed to query bridgeBank address")?
        ._0;
    let cosmos_bridge = registry
        .cosmosBridge()
        .call()
        .await
        .wrap_err("Failed to query cosmosBridge address")?
        ._0;
    let oracle = registry
        .oracle()
        .call()
        .await
        .wrap_err("Failed to query oracle address")?
        ._0;

    tracing::info!(
        bridge_bank = %bridge_bank,
        cosmos_bridge = %cosmos_bridge,
        oracle = %oracle,
        "Resolved bridge contracts from registry"
    );

    Ok(ResolvedContracts {
        bridge_bank,
        cosmos_bridge,
        oracle,
    })
}
