//! Serde forms for binary reply fields.
//!
//! The upstream surface is JSON: raw reply bytes travel either as an
//! upper-case hex string (the canonical form) or as an array of integers
//! (the alternative form some consumers prefer for family Z).

use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};

/// Byte field serialized as an upper-case hexadecimal string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hex(pub Vec<u8>);

impl Serialize for Hex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode_upper(&self.0))
    }
}

impl<'de> Deserialize<'de> for Hex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        hex::decode(&text).map(Hex).map_err(D::Error::custom)
    }
}

impl From<&[u8]> for Hex {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

/// Byte field serialized as an array of integers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteArray(pub Vec<u8>);

impl From<&[u8]> for ByteArray {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}
