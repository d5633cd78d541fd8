//! Legacy (pre-EIP-1559) transactions with EIP-155 replay protection.

use super::rlp::Rlp;
use crate::address::Address;
use crate::broker::BrokerKey;
use crate::error::Result;
use crate::hash::keccak256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: u64,
    pub gas_price: u64,
    pub gas_limit: u64,
    pub to: Address,
    pub value: u128,
    pub data: Vec<u8>,
}

/// A signed, RLP-encoded transaction ready for `eth_sendRawTransaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub raw: Vec<u8>,
    pub hash: [u8; 32],
}

impl SignedTransaction {
    pub fn raw_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.raw))
    }

    pub fn hash_hex(&self) -> String {
        format!("0x{}", hex::encode(self.hash))
    }
}

impl LegacyTransaction {
    fn fields(&self) -> Vec<Rlp> {
        vec![
            Rlp::uint(u128::from(self.nonce)),
            Rlp::uint(u128::from(self.gas_price)),
            Rlp::uint(u128::from(self.gas_limit)),
            Rlp::bytes(self.to.as_bytes()),
            Rlp::uint(self.value),
            Rlp::bytes(&self.data),
        ]
    }

    /// Hash signed by the sender: `rlp([..fields, chainId, 0, 0])`.
    pub fn signing_hash(&self, chain_id: u64) -> [u8; 32] {
        let mut items = self.fields();
        items.extend([Rlp::uint(u128::from(chain_id)), Rlp::uint(0), Rlp::uint(0)]);
        keccak256(Rlp::List(items).encode())
    }

    pub fn sign(&self, key: &BrokerKey, chain_id: u64) -> Result<SignedTransaction> {
        let signature = key.sign_hash(&self.signing_hash(chain_id))?;
        let v = u128::from(signature[64]) + u128::from(chain_id) * 2 + 35;

        let mut items = self.fields();
        items.extend([
            Rlp::uint(v),
            Rlp::scalar(&signature[..32]),
            Rlp::scalar(&signature[32..64]),
        ]);
        let raw = Rlp::List(items).encode();
        let hash = keccak256(&raw);
        Ok(SignedTransaction { raw, hash })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eip155_example() -> LegacyTransaction {
        LegacyTransaction {
            nonce: 9,
            gas_price: 20_000_000_000,
            gas_limit: 21_000,
            to: Address([0x35; 20]),
            value: 1_000_000_000_000_000_000,
            data: Vec::new(),
        }
    }

    #[test]
    fn test_eip155_signing_hash() {
        assert_eq!(
            hex::encode(eip155_example().signing_hash(1)),
            "daf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53"
        );
    }

    #[test]
    fn test_eip155_signed_transaction() {
        let key = BrokerKey::from_hex(&"46".repeat(32)).unwrap();
        let signed = eip155_example().sign(&key, 1).unwrap();
        assert_eq!(
            hex::encode(&signed.raw),
            concat!(
                "f86c098504a817c800825208943535353535353535353535353535353535353535",
                "880de0b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c",
                "71ff63e1590620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc",
                "64214b297fb1966a3b6d83"
            )
        );
        assert_eq!(
            signed.hash_hex(),
            "0x33469b22e9f636356c4160a87eb19df52b7412e8eac32a4a55ffe88ea8350788"
        );
    }
}
