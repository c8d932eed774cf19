//! Claim signing for the Ethereum Oracle contract.
//!
//! The verifying contract recomputes the claim message on-chain, so the
//! packed encoding here must match it bit for bit:
//!
//! `hash = keccak256(be256(prophecyId) || senderBytes || pad32(receiver) || symbolBytes || be256(amount))`
//!
//! then the personal-sign prefix convention
//! (`keccak256("\x19Ethereum Signed Message:\n32" || hash)`), signed
//! with secp256k1 into a 65-byte `r||s||v` signature recoverable via
//! standard `ecrecover`.

use alloy::primitives::{Address, U256};
use eyre::{eyre, Result, WrapErr};
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use tiny_keccak::{Hasher, Keccak};

use crate::types::{ProphecyClaimRelay, SignedOracleClaim};

/// Compute keccak256 hash of data
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    output
}

/// Packed claim message the Oracle contract verifies.
///
/// Packed encoding: integers as 32-byte big-endian words, the sender
/// and symbol as their raw bytes, the receiver address left-padded to
/// 32 bytes.
pub fn claim_message_hash(
    prophecy_id: U256,
    cosmos_sender: &[u8],
    ethereum_receiver: Address,
    symbol: &str,
    amount: U256,
) -> [u8; 32] {
    let mut data = Vec::with_capacity(32 + cosmos_sender.len() + 32 + symbol.len() + 32);
    data.extend_from_slice(&prophecy_id.to_be_bytes::<32>());
    data.extend_from_slice(cosmos_sender);
    let mut receiver_word = [0u8; 32];
    receiver_word[12..].copy_from_slice(ethereum_receiver.as_slice());
    data.extend_from_slice(&receiver_word);
    data.extend_from_slice(symbol.as_bytes());
    data.extend_from_slice(&amount.to_be_bytes::<32>());
    keccak256(&data)
}

/// Re-hash under the personal-sign convention the verifying contract
/// applies before `ecrecover`.
pub fn prefix_message_hash(message_hash: &[u8; 32]) -> [u8; 32] {
    const PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";
    let mut data = Vec::with_capacity(PREFIX.len() + 32);
    data.extend_from_slice(PREFIX);
    data.extend_from_slice(message_hash);
    keccak256(&data)
}

/// Holds the validator's secp256k1 key and produces oracle claim
/// signatures.
pub struct ClaimSigner {
    signing_key: SigningKey,
}

impl ClaimSigner {
    /// Build from a 0x-prefixed 32-byte hex private key. Malformed key
    /// material is fatal: retrying with the same key cannot succeed.
    pub fn from_hex(private_key: &str) -> Result<Self> {
        let hex_str = private_key.strip_prefix("0x").unwrap_or(private_key);
        let bytes = hex::decode(hex_str).wrap_err("Private key is not valid hex")?;
        let signing_key =
            SigningKey::from_slice(&bytes).map_err(|e| eyre!("Invalid private key: {}", e))?;
        Ok(Self { signing_key })
    }

    /// Ethereum address derived from the signing key:
    /// `keccak256(uncompressed_pubkey[1..])[12..]`.
    pub fn address(&self) -> Address {
        address_of(self.signing_key.verifying_key())
    }

    /// Sign a prefixed 32-byte hash, producing `r||s||v` with
    /// `v ∈ {27, 28}`.
    pub fn sign_prehash(&self, prehash: &[u8; 32]) -> Result<[u8; 65]> {
        let (signature, recovery_id): (Signature, RecoveryId) = self
            .signing_key
            .sign_prehash_recoverable(prehash)
            .map_err(|e| eyre!("Signing failed: {}", e))?;

        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&signature.to_bytes());
        out[64] = 27 + recovery_id.to_byte();
        Ok(out)
    }

    /// Canonicalize a witnessed prophecy claim into the signed payload
    /// relayed to the Oracle contract.
    pub fn sign_oracle_claim(&self, relay: &ProphecyClaimRelay) -> Result<SignedOracleClaim> {
        let message = claim_message_hash(
            relay.prophecy_id,
            &relay.cosmos_sender,
            relay.ethereum_receiver,
            &relay.symbol,
            relay.amount,
        );
        let signature = self.sign_prehash(&prefix_message_hash(&message))?;
        Ok(SignedOracleClaim {
            prophecy_id: relay.prophecy_id,
            message,
            signature,
        })
    }
}

/// Recover the signer address from a prefixed hash and a 65-byte
/// `r||s||v` signature; the counterpart of the contract's `ecrecover`.
pub fn recover_address(prehash: &[u8; 32], signature: &[u8; 65]) -> Result<Address> {
    let sig = Signature::from_slice(&signature[..64])
        .map_err(|e| eyre!("Invalid signature bytes: {}", e))?;
    let v = signature[64];
    let recovery_byte = v.checked_sub(27).ok_or_else(|| eyre!("Invalid v byte: {}", v))?;
    let recovery_id =
        RecoveryId::from_byte(recovery_byte).ok_or_else(|| eyre!("Invalid recovery id: {}", v))?;
    let verifying_key = VerifyingKey::recover_from_prehash(prehash, &sig, recovery_id)
        .map_err(|e| eyre!("Recovery failed: {}", e))?;
    Ok(address_of(&verifying_key))
}

fn address_of(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    // Skip the 0x04 uncompressed-point tag.
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}
