//! Catalog identifiers and their 12-byte on-chain category form.
//!
//! Catalog ids are xid values: 12 bytes rendered as 20 characters of
//! lowercase base32hex (`0-9a-v`) without padding. The contract buckets
//! token counts by the raw 12 bytes (`bytes12 categoryId`).

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const ALPHABET: &[u8; 32] = b"0123456789abcdefghijklmnopqrstuv";

/// Length of the text form.
pub const CATEGORY_ID_TEXT_LEN: usize = 20;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CategoryIdError {
    #[error("category id must be {CATEGORY_ID_TEXT_LEN} characters, got {0}")]
    InvalidLength(usize),

    #[error("invalid character {0:?} in category id")]
    InvalidCharacter(char),

    #[error("category id has non-zero trailing bits")]
    NonCanonical,
}

/// The fixed 12-byte category id passed to `safeMint`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CategoryId(pub [u8; 12]);

impl CategoryId {
    pub fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }

    /// Right-pad to a 32-byte ABI word (`bytes12` encoding).
    pub fn to_word(&self) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[..12].copy_from_slice(&self.0);
        word
    }
}

fn decode_char(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'v' => Some(c - b'a' + 10),
        _ => None,
    }
}

impl FromStr for CategoryId {
    type Err = CategoryIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != CATEGORY_ID_TEXT_LEN {
            return Err(CategoryIdError::InvalidLength(s.len()));
        }

        let mut bytes = [0u8; 12];
        let mut acc: u32 = 0;
        let mut bits = 0u32;
        let mut out = 0usize;

        for c in s.bytes() {
            let value = decode_char(c).ok_or(CategoryIdError::InvalidCharacter(c as char))?;
            acc = (acc << 5) | u32::from(value);
            bits += 5;
            if bits >= 8 {
                bits -= 8;
                bytes[out] = (acc >> bits) as u8;
                out += 1;
                acc &= (1 << bits) - 1;
            }
        }

        // 100 bits of text for 96 bits of data: the last 4 must be zero.
        if acc != 0 {
            return Err(CategoryIdError::NonCanonical);
        }

        Ok(Self(bytes))
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut acc: u32 = 0;
        let mut bits = 0u32;
        let mut out = String::with_capacity(CATEGORY_ID_TEXT_LEN);

        for &byte in &self.0 {
            acc = (acc << 8) | u32::from(byte);
            bits += 8;
            while bits >= 5 {
                bits -= 5;
                out.push(ALPHABET[((acc >> bits) & 0x1f) as usize] as char);
            }
            acc &= (1 << bits) - 1;
        }
        if bits > 0 {
            out.push(ALPHABET[((acc << (5 - bits)) & 0x1f) as usize] as char);
        }

        f.write_str(&out)
    }
}

impl fmt::Debug for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CategoryId({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KNOWN: [u8; 12] = [
        0x4d, 0x88, 0xe1, 0x5b, 0x60, 0xf4, 0x86, 0xe4, 0x28, 0x41, 0x2d, 0xc9,
    ];

    #[test]
    fn test_decode_known_xid() {
        let id: CategoryId = "9m4e2mr0ui3e8a215n4g".parse().unwrap();
        assert_eq!(id.0, KNOWN);
    }

    #[test]
    fn test_display_known_xid() {
        assert_eq!(CategoryId(KNOWN).to_string(), "9m4e2mr0ui3e8a215n4g");
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert_eq!(
            "9m4e2mr0".parse::<CategoryId>(),
            Err(CategoryIdError::InvalidLength(8))
        );
    }

    #[test]
    fn test_rejects_out_of_alphabet() {
        // 'w' and uppercase are outside base32hex lowercase
        assert_eq!(
            "9m4e2mr0ui3e8a215n4w".parse::<CategoryId>(),
            Err(CategoryIdError::InvalidCharacter('w'))
        );
        assert!("9M4E2MR0UI3E8A215N4G".parse::<CategoryId>().is_err());
    }

    #[test]
    fn test_rejects_trailing_bits() {
        // 'h' = 17 = 0b10001 sets one of the four padding bits
        assert_eq!(
            "9m4e2mr0ui3e8a215n4h".parse::<CategoryId>(),
            Err(CategoryIdError::NonCanonical)
        );
    }

    #[test]
    fn test_word_is_right_padded() {
        let word = CategoryId(KNOWN).to_word();
        assert_eq!(&word[..12], &KNOWN);
        assert_eq!(&word[12..], &[0u8; 20]);
    }
}
