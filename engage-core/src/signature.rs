//! Claim signature verification.
//!
//! A claimant proves consent by signing the EIP-712 `claim` document
//! `{catalogId: string, wallet: address}` with the wallet's key. The server
//! recovers the signer from the signature and requires it to be the wallet.

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::address::Address;
use crate::config::DomainConfig;
use crate::error::{ClaimError, Result};
use crate::typed_data::{TypedData, TypedDataDomain, TypedField, Types, DOMAIN_TYPE};

/// Primary type of the claim document.
pub const CLAIM_TYPE: &str = "claim";

/// Length of an `r ‖ s ‖ v` signature.
pub const SIGNATURE_LEN: usize = 65;

/// Build the claim signing document for one (catalog, wallet) pair.
///
/// The document is constructed fresh on every call.
pub fn claim_typed_data(domain: &DomainConfig, catalog_id: &str, wallet: &str) -> TypedData {
    let mut types = Types::new();
    types.insert(
        DOMAIN_TYPE.to_string(),
        vec![
            TypedField::new("name", "string"),
            TypedField::new("version", "string"),
            TypedField::new("chainId", "uint256"),
            TypedField::new("verifyingContract", "address"),
        ],
    );
    types.insert(
        CLAIM_TYPE.to_string(),
        vec![
            TypedField::new("catalogId", "string"),
            TypedField::new("wallet", "address"),
        ],
    );

    let mut message = Map::new();
    message.insert("catalogId".into(), Value::String(catalog_id.to_string()));
    message.insert("wallet".into(), Value::String(wallet.to_string()));

    TypedData {
        types,
        primary_type: CLAIM_TYPE.to_string(),
        domain: TypedDataDomain {
            name: domain.name.clone(),
            version: domain.version.clone(),
            chain_id: domain.chain_id,
            verifying_contract: domain.verifying_contract.clone(),
            salt: (!domain.salt.is_empty()).then(|| domain.salt.clone()),
        },
        message,
    }
}

/// Decode a hex `r ‖ s ‖ v` signature, checking length and recovery byte.
pub fn decode_signature(signature_hex: &str) -> Result<[u8; SIGNATURE_LEN]> {
    let digits = signature_hex
        .trim()
        .strip_prefix("0x")
        .unwrap_or(signature_hex.trim());
    let bytes = hex::decode(digits)
        .map_err(|e| ClaimError::signature(format!("signature is not hex: {e}")))?;

    let signature: [u8; SIGNATURE_LEN] = bytes.try_into().map_err(|v: Vec<u8>| {
        ClaimError::signature(format!(
            "signature must be {SIGNATURE_LEN} bytes, got {}",
            v.len()
        ))
    })?;

    let v = signature[SIGNATURE_LEN - 1];
    if v != 27 && v != 28 {
        return Err(ClaimError::signature(format!("invalid recovery id {v}")));
    }
    Ok(signature)
}

/// Recover the signer of `hash` from a decoded 65-byte signature (v ∈ {27, 28}).
pub fn recover_signer(hash: &[u8; 32], signature: &[u8; SIGNATURE_LEN]) -> Result<Address> {
    let recovery_byte = signature[SIGNATURE_LEN - 1]
        .checked_sub(27)
        .ok_or_else(|| ClaimError::signature("invalid recovery id"))?;
    let recovery_id = RecoveryId::from_byte(recovery_byte)
        .ok_or_else(|| ClaimError::signature("invalid recovery id"))?;

    let sig = Signature::from_slice(&signature[..64])
        .map_err(|e| ClaimError::signature(format!("malformed signature: {e}")))?;

    let key = VerifyingKey::recover_from_prehash(hash, &sig, recovery_id)
        .map_err(|e| ClaimError::signature(format!("public key recovery failed: {e}")))?;

    Ok(Address::from_verifying_key(&key))
}

/// Sign a 32-byte digest, returning `r ‖ s ‖ recovery_id` (recovery id 0 or 1).
pub(crate) fn sign_digest(key: &SigningKey, hash: &[u8; 32]) -> Result<[u8; SIGNATURE_LEN]> {
    let (sig, recovery_id) = key
        .sign_prehash_recoverable(hash)
        .map_err(|e| ClaimError::internal(format!("signing failed: {e}")))?;

    let mut out = [0u8; SIGNATURE_LEN];
    out[..64].copy_from_slice(&sig.to_bytes());
    out[64] = recovery_id.to_byte();
    Ok(out)
}

/// Parse a hex-encoded secp256k1 private key.
pub(crate) fn parse_signing_key(key_hex: &str) -> Result<SigningKey> {
    let digits = key_hex.trim().strip_prefix("0x").unwrap_or(key_hex.trim());
    let bytes = Zeroizing::new(
        hex::decode(digits).map_err(|_| ClaimError::internal("private key is not valid hex"))?,
    );
    SigningKey::from_slice(&bytes).map_err(|_| ClaimError::internal("invalid secp256k1 private key"))
}

/// Verifies claim signatures against a fixed EIP-712 domain.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    domain: DomainConfig,
}

impl SignatureVerifier {
    pub fn new(domain: DomainConfig) -> Self {
        Self { domain }
    }

    pub fn domain(&self) -> &DomainConfig {
        &self.domain
    }

    /// The typed-data document a wallet signs to claim `catalog_id`.
    pub fn signing_payload(&self, catalog_id: &str, wallet: &str) -> TypedData {
        claim_typed_data(&self.domain, catalog_id, wallet)
    }

    pub fn signing_hash(&self, catalog_id: &str, wallet: &str) -> Result<[u8; 32]> {
        self.signing_payload(catalog_id, wallet)
            .signing_hash()
            .map_err(|e| ClaimError::signature(format!("typed data: {e}")))
    }

    /// Check that `signature_hex` is `wallet`'s signature over the claim for `catalog_id`.
    pub fn verify(&self, wallet: &str, signature_hex: &str, catalog_id: &str) -> Result<()> {
        let expected: Address = wallet
            .parse()
            .map_err(|e| ClaimError::signature(format!("invalid wallet address: {e}")))?;

        let hash = self.signing_hash(catalog_id, wallet)?;
        let signature = decode_signature(signature_hex)?;
        let recovered = recover_signer(&hash, &signature)?;

        debug!(wallet = %expected, recovered = %recovered, "Recovered claim signer");

        if recovered.as_bytes() != expected.as_bytes() {
            warn!(wallet = %expected, recovered = %recovered, catalog_id, "Signer does not match wallet");
            return Err(ClaimError::signature("signer does not match wallet"));
        }
        Ok(())
    }
}

/// Signs claims with a local key, the way a wallet would.
pub struct ClaimSigner {
    key: SigningKey,
}

impl ClaimSigner {
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    /// Load a signer from a hex-encoded private key.
    pub fn from_hex(key_hex: &str) -> Result<Self> {
        parse_signing_key(key_hex).map(Self::new)
    }

    pub fn address(&self) -> Address {
        Address::from_verifying_key(self.key.verifying_key())
    }

    /// Sign the claim document, returning `0x`-prefixed `r ‖ s ‖ v` hex with v ∈ {27, 28}.
    pub fn sign_claim(&self, domain: &DomainConfig, catalog_id: &str) -> Result<String> {
        let wallet = self.address().to_string();
        let hash = claim_typed_data(domain, catalog_id, &wallet)
            .signing_hash()
            .map_err(|e| ClaimError::internal(format!("typed data: {e}")))?;

        let mut signature = sign_digest(&self.key, &hash)?;
        signature[SIGNATURE_LEN - 1] += 27;
        Ok(format!("0x{}", hex::encode(signature)))
    }
}

impl std::fmt::Debug for ClaimSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaimSigner")
            .field("address", &self.address())
            .finish()
    }
}
