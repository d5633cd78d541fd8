//! Minimal RLP encoder for legacy transactions.

/// An RLP item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rlp {
    Bytes(Vec<u8>),
    List(Vec<Rlp>),
}

impl Rlp {
    /// Unsigned integer as minimal big-endian bytes (zero is the empty string).
    pub fn uint(value: u128) -> Self {
        Self::Bytes(trim_leading_zeros(&value.to_be_bytes()).to_vec())
    }

    /// Big-endian scalar with leading zeros stripped, e.g. a signature component.
    pub fn scalar(bytes: &[u8]) -> Self {
        Self::Bytes(trim_leading_zeros(bytes).to_vec())
    }

    pub fn bytes(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Rlp::Bytes(bytes) if bytes.len() == 1 && bytes[0] < 0x80 => out.push(bytes[0]),
            Rlp::Bytes(bytes) => {
                encode_length(bytes.len(), 0x80, out);
                out.extend_from_slice(bytes);
            }
            Rlp::List(items) => {
                let mut payload = Vec::new();
                for item in items {
                    item.encode_into(&mut payload);
                }
                encode_length(payload.len(), 0xc0, out);
                out.extend_from_slice(&payload);
            }
        }
    }
}

fn trim_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

fn encode_length(len: usize, offset: u8, out: &mut Vec<u8>) {
    if len < 56 {
        out.push(offset + len as u8);
    } else {
        let len_bytes = (len as u64).to_be_bytes();
        let trimmed = trim_leading_zeros(&len_bytes);
        out.push(offset + 55 + trimmed.len() as u8);
        out.extend_from_slice(trimmed);
    }
}
