//! The service-held key that signs and pays for mint transactions.

use k256::ecdsa::SigningKey;

use crate::address::Address;
use crate::error::Result;
use crate::signature::{parse_signing_key, sign_digest, SIGNATURE_LEN};

/// Broker secp256k1 key. The scalar is zeroized when dropped.
#[derive(Clone)]
pub struct BrokerKey {
    key: SigningKey,
    address: Address,
}

impl BrokerKey {
    pub fn new(key: SigningKey) -> Self {
        let address = Address::from_verifying_key(key.verifying_key());
        Self { key, address }
    }

    /// Load from a hex private key (optional `0x`).
    pub fn from_hex(key_hex: &str) -> Result<Self> {
        parse_signing_key(key_hex).map(Self::new)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign a 32-byte digest; the last byte is the raw recovery id (0 or 1).
    pub fn sign_hash(&self, hash: &[u8; 32]) -> Result<[u8; SIGNATURE_LEN]> {
        sign_digest(&self.key, hash)
    }
}

impl std::fmt::Debug for BrokerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerKey")
            .field("address", &self.address)
            .field("key", &"[REDACTED]")
            .finish()
    }
}
