//! Ethereum bridge contract ABI definitions
//!
//! Uses alloy's sol! macro to generate type-safe bindings for the
//! contracts the relayer consumes. Only the surface the relayer touches
//! is declared; the contract implementations are external.

#![allow(clippy::too_many_arguments)]

use alloy::sol;

sol! {
    /// Resolves the deployed bridge contracts by role. Queried once at
    /// startup instead of hardcoding addresses.
    #[sol(rpc)]
    contract BridgeRegistry {
        function bridgeBank() external view returns (address);
        function oracle() external view returns (address);
        function cosmosBridge() external view returns (address);
        function valset() external view returns (address);
    }

    /// Asset custody contract. Lock events carry native-asset deposits
    /// bound for the Cosmos chain; burn events destroy bridge-wrapped
    /// Cosmos assets for release on their home chain.
    #[sol(rpc)]
    contract BridgeBank {
        event LogLock(
            bytes32 id,
            address from,
            bytes to,
            address token,
            string symbol,
            uint256 value,
            uint256 nonce
        );

        event LogBurn(
            bytes32 id,
            address from,
            bytes to,
            address token,
            string symbol,
            uint256 value,
            uint256 nonce
        );
    }

    /// Entry point for Cosmos-originated transfers. A relayer opens a
    /// prophecy claim here; the emitted event is what validators sign
    /// for the Oracle contract.
    #[sol(rpc)]
    contract CosmosBridge {
        function newProphecyClaim(
            uint256 nonce,
            bytes cosmosSender,
            address ethereumReceiver,
            address tokenAddress,
            string symbol,
            uint256 amount
        ) external;

        event LogNewProphecyClaim(
            uint256 prophecyId,
            bytes cosmosSender,
            address ethereumReceiver,
            string symbol,
            uint256 amount
        );
    }

    /// On-chain weighted-consensus verifier for signed oracle claims.
    #[sol(rpc)]
    contract Oracle {
        function newOracleClaim(
            uint256 prophecyId,
            bytes32 message,
            uint8 v,
            bytes32 r,
            bytes32 s
        ) external;
    }
}
