//! EIP-712 structured data hashing.
//!
//! Implements `encodeType`, `hashStruct` and the final signing hash
//! `keccak256(0x19 0x01 ‖ domainSeparator ‖ hashStruct(message))` over
//! JSON-valued messages, matching what wallets compute for
//! `eth_signTypedData_v4`.
//!
//! Reference: <https://eips.ethereum.org/EIPS/eip-712>

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::address::Address;
use crate::hash::{keccak256, keccak256_concat};

/// Name of the domain type.
pub const DOMAIN_TYPE: &str = "EIP712Domain";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypedDataError {
    #[error("unknown type: {0}")]
    UnknownType(String),

    #[error("missing field {field} in {type_name}")]
    MissingField { type_name: String, field: String },

    #[error("invalid value for {kind}: {reason}")]
    InvalidValue { kind: String, reason: String },
}

fn invalid(kind: &str, reason: impl Into<String>) -> TypedDataError {
    TypedDataError::InvalidValue {
        kind: kind.to_string(),
        reason: reason.into(),
    }
}

/// A single member of a struct type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedField {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl TypedField {
    pub fn new(name: &str, kind: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
        }
    }
}

/// Struct type definitions keyed by type name.
pub type Types = BTreeMap<String, Vec<TypedField>>;

/// The EIP-712 domain as handed to wallets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedDataDomain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
}

impl TypedDataDomain {
    /// Domain values used for the separator. The salt is never hashed.
    pub fn separator_values(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("name".into(), Value::String(self.name.clone()));
        map.insert("version".into(), Value::String(self.version.clone()));
        map.insert("chainId".into(), Value::from(self.chain_id));
        map.insert(
            "verifyingContract".into(),
            Value::String(self.verifying_contract.clone()),
        );
        map
    }
}

/// A complete typed-data document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedData {
    pub types: Types,
    pub primary_type: String,
    pub domain: TypedDataDomain,
    pub message: Map<String, Value>,
}

impl TypedData {
    /// `encodeType`: the primary type followed by its referenced struct
    /// types in alphabetical order.
    pub fn encode_type(&self, primary: &str) -> Result<String, TypedDataError> {
        let mut deps = BTreeSet::new();
        self.collect_dependencies(primary, &mut deps)?;
        deps.remove(primary);

        let mut out = self.encode_single_type(primary)?;
        for dep in deps {
            out.push_str(&self.encode_single_type(&dep)?);
        }
        Ok(out)
    }

    pub fn type_hash(&self, primary: &str) -> Result<[u8; 32], TypedDataError> {
        Ok(keccak256(self.encode_type(primary)?.as_bytes()))
    }

    /// `hashStruct(s) = keccak256(typeHash ‖ encodeData(s))`.
    pub fn hash_struct(
        &self,
        primary: &str,
        data: &Map<String, Value>,
    ) -> Result<[u8; 32], TypedDataError> {
        let fields = self.fields(primary)?;

        let mut encoded = Vec::with_capacity(32 * (fields.len() + 1));
        encoded.extend_from_slice(&self.type_hash(primary)?);
        for field in fields {
            let value = data
                .get(&field.name)
                .ok_or_else(|| TypedDataError::MissingField {
                    type_name: primary.to_string(),
                    field: field.name.clone(),
                })?;
            encoded.extend_from_slice(&self.encode_value(&field.kind, value)?);
        }
        Ok(keccak256(&encoded))
    }

    pub fn domain_separator(&self) -> Result<[u8; 32], TypedDataError> {
        self.hash_struct(DOMAIN_TYPE, &self.domain.separator_values())
    }

    pub fn message_hash(&self) -> Result<[u8; 32], TypedDataError> {
        self.hash_struct(&self.primary_type, &self.message)
    }

    /// The digest a wallet signs: `keccak256(0x19 0x01 ‖ domainSeparator ‖ structHash)`.
    pub fn signing_hash(&self) -> Result<[u8; 32], TypedDataError> {
        let struct_hash = self.message_hash()?;
        let domain_separator = self.domain_separator()?;
        Ok(keccak256_concat(&[
            &[0x19, 0x01],
            &domain_separator,
            &struct_hash,
        ]))
    }

    fn fields(&self, type_name: &str) -> Result<&[TypedField], TypedDataError> {
        self.types
            .get(type_name)
            .map(Vec::as_slice)
            .ok_or_else(|| TypedDataError::UnknownType(type_name.to_string()))
    }

    fn encode_single_type(&self, type_name: &str) -> Result<String, TypedDataError> {
        let members = self
            .fields(type_name)?
            .iter()
            .map(|f| format!("{} {}", f.kind, f.name))
            .collect::<Vec<_>>()
            .join(",");
        Ok(format!("{type_name}({members})"))
    }

    fn collect_dependencies(
        &self,
        type_name: &str,
        found: &mut BTreeSet<String>,
    ) -> Result<(), TypedDataError> {
        if found.contains(type_name) {
            return Ok(());
        }
        found.insert(type_name.to_string());
        for field in self.fields(type_name)? {
            let base = strip_array_suffix(&field.kind);
            if self.types.contains_key(base) {
                self.collect_dependencies(base, found)?;
            }
        }
        Ok(())
    }

    fn encode_value(&self, kind: &str, value: &Value) -> Result<[u8; 32], TypedDataError> {
        if let Some(inner) = array_element_type(kind) {
            let items = value
                .as_array()
                .ok_or_else(|| invalid(kind, "expected an array"))?;
            let mut concat = Vec::with_capacity(items.len() * 32);
            for item in items {
                concat.extend_from_slice(&self.encode_value(inner, item)?);
            }
            return Ok(keccak256(&concat));
        }

        if self.types.contains_key(kind) {
            let object = value
                .as_object()
                .ok_or_else(|| invalid(kind, "expected an object"))?;
            return self.hash_struct(kind, object);
        }

        encode_atomic(kind, value)
    }
}

fn strip_array_suffix(kind: &str) -> &str {
    kind.find('[').map_or(kind, |idx| &kind[..idx])
}

fn array_element_type(kind: &str) -> Option<&str> {
    if kind.ends_with(']') {
        kind.rfind('[').map(|idx| &kind[..idx])
    } else {
        None
    }
}

fn encode_atomic(kind: &str, value: &Value) -> Result<[u8; 32], TypedDataError> {
    match kind {
        "string" => {
            let s = value
                .as_str()
                .ok_or_else(|| invalid(kind, "expected a string"))?;
            Ok(keccak256(s.as_bytes()))
        }
        "bytes" => Ok(keccak256(decode_hex_value(kind, value)?)),
        "address" => {
            let s = value
                .as_str()
                .ok_or_else(|| invalid(kind, "expected a string"))?;
            let address: Address = s.parse().map_err(|e| invalid(kind, format!("{e}")))?;
            Ok(address.to_word())
        }
        "bool" => {
            let b = value
                .as_bool()
                .ok_or_else(|| invalid(kind, "expected a boolean"))?;
            let mut word = [0u8; 32];
            word[31] = u8::from(b);
            Ok(word)
        }
        _ if kind.starts_with("uint") => encode_integer(kind, value, false),
        _ if kind.starts_with("int") => encode_integer(kind, value, true),
        _ if kind.starts_with("bytes") => {
            let size: usize = kind[5..]
                .parse()
                .map_err(|_| TypedDataError::UnknownType(kind.to_string()))?;
            if size == 0 || size > 32 {
                return Err(TypedDataError::UnknownType(kind.to_string()));
            }
            let bytes = decode_hex_value(kind, value)?;
            if bytes.len() > size {
                return Err(invalid(kind, format!("{} bytes exceeds {size}", bytes.len())));
            }
            let mut word = [0u8; 32];
            word[..bytes.len()].copy_from_slice(&bytes);
            Ok(word)
        }
        _ => Err(TypedDataError::UnknownType(kind.to_string())),
    }
}

fn decode_hex_value(kind: &str, value: &Value) -> Result<Vec<u8>, TypedDataError> {
    let s = value
        .as_str()
        .ok_or_else(|| invalid(kind, "expected a hex string"))?;
    let digits = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(digits).map_err(|e| invalid(kind, e.to_string()))
}

/// Encode a JSON number or decimal/hex string as a 32-byte big-endian word.
fn encode_integer(kind: &str, value: &Value, signed: bool) -> Result<[u8; 32], TypedDataError> {
    let mut word = [0u8; 32];

    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return Err(invalid(kind, "expected a number")),
    };

    if let Some(hex_digits) = text.strip_prefix("0x") {
        if hex_digits.is_empty() || hex_digits.len() > 64 {
            return Err(invalid(kind, "hex value out of range"));
        }
        let padded = format!("{hex_digits:0>64}");
        hex::decode_to_slice(&padded, &mut word).map_err(|e| invalid(kind, e.to_string()))?;
        return Ok(word);
    }

    if signed {
        let n: i128 = text
            .parse()
            .map_err(|_| invalid(kind, format!("not an integer: {text}")))?;
        let fill = if n < 0 { 0xff } else { 0x00 };
        word[..16].fill(fill);
        word[16..].copy_from_slice(&n.to_be_bytes());
    } else {
        let n: u128 = text
            .parse()
            .map_err(|_| invalid(kind, format!("not an unsigned integer: {text}")))?;
        word[16..].copy_from_slice(&n.to_be_bytes());
    }
    Ok(word)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// The "Mail" example from the EIP-712 specification.
    fn mail_example() -> TypedData {
        let mut types = Types::new();
        types.insert(
            DOMAIN_TYPE.into(),
            vec![
                TypedField::new("name", "string"),
                TypedField::new("version", "string"),
                TypedField::new("chainId", "uint256"),
                TypedField::new("verifyingContract", "address"),
            ],
        );
        types.insert(
            "Person".into(),
            vec![
                TypedField::new("name", "string"),
                TypedField::new("wallet", "address"),
            ],
        );
        types.insert(
            "Mail".into(),
            vec![
                TypedField::new("from", "Person"),
                TypedField::new("to", "Person"),
                TypedField::new("contents", "string"),
            ],
        );

        let message = json!({
            "from": { "name": "Cow", "wallet": "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826" },
            "to": { "name": "Bob", "wallet": "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB" },
            "contents": "Hello, Bob!"
        });

        TypedData {
            types,
            primary_type: "Mail".into(),
            domain: TypedDataDomain {
                name: "Ether Mail".into(),
                version: "1".into(),
                chain_id: 1,
                verifying_contract: "0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC".into(),
                salt: None,
            },
            message: message.as_object().cloned().unwrap(),
        }
    }

    #[test]
    fn test_encode_type_orders_dependencies() {
        let td = mail_example();
        assert_eq!(
            td.encode_type("Mail").unwrap(),
            "Mail(Person from,Person to,string contents)Person(string name,address wallet)"
        );
    }

    #[test]
    fn test_eip712_reference_vectors() {
        let td = mail_example();
        assert_eq!(
            hex::encode(td.type_hash("Mail").unwrap()),
            "a0cedeb2dc280ba39b857546d74f5549c3a1d7bdc2dd96bf881f76108e23dac2"
        );
        assert_eq!(
            hex::encode(td.message_hash().unwrap()),
            "c52c0ee5d84264471806290a3f2c4cecfc5490626bf912d01f240d7a274b371e"
        );
        assert_eq!(
            hex::encode(td.domain_separator().unwrap()),
            "f2cee375fa42b42143804025fc449deafd50cc031ca257e0b194a650a912090f"
        );
        assert_eq!(
            hex::encode(td.signing_hash().unwrap()),
            "be609aee343fb3c4b28e1df9e632fca64fcfaede20f02e86244efddf30957bd2"
        );
    }

    #[test]
    fn test_salt_does_not_change_separator() {
        let mut td = mail_example();
        let without = td.domain_separator().unwrap();
        td.domain.salt = Some("0x1234".into());
        assert_eq!(td.domain_separator().unwrap(), without);
    }

    #[test]
    fn test_missing_field_is_error() {
        let mut td = mail_example();
        td.message.remove("contents");
        assert_eq!(
            td.message_hash(),
            Err(TypedDataError::MissingField {
                type_name: "Mail".into(),
                field: "contents".into()
            })
        );
    }

    #[test]
    fn test_unknown_atomic_type() {
        assert_eq!(
            encode_atomic("float", &json!(1.0)),
            Err(TypedDataError::UnknownType("float".into()))
        );
    }

    #[test]
    fn test_integer_encodings() {
        let word = encode_integer("uint256", &json!(137), false).unwrap();
        assert_eq!(word[31], 137);
        assert_eq!(&word[..31], &[0u8; 31]);

        let hex_word = encode_integer("uint256", &json!("0x89"), false).unwrap();
        assert_eq!(word, hex_word);

        let negative = encode_integer("int256", &json!(-1), true).unwrap();
        assert_eq!(negative, [0xff; 32]);
    }

    #[test]
    fn test_fixed_bytes_right_padded() {
        let word = encode_atomic("bytes4", &json!("0xdeadbeef")).unwrap();
        assert_eq!(&word[..4], &[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(&word[4..], &[0u8; 28]);
        assert!(encode_atomic("bytes2", &json!("0xdeadbeef")).is_err());
    }

    #[test]
    fn test_array_encoding_hashes_elements() {
        let td = mail_example();
        let encoded = td.encode_value("uint8[]", &json!([1, 2])).unwrap();
        let mut concat = [0u8; 64];
        concat[31] = 1;
        concat[63] = 2;
        assert_eq!(encoded, keccak256(concat));
    }
}
