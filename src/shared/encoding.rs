//! Serde helpers for binary fields
//!
//! Byte payloads (contexts, auth messages, proofs) travel as lowercase hex strings.

use serde::{Deserialize, Deserializer, Serializer};

/// `#[serde(with = "crate::shared::encoding::hex_bytes")]`
pub mod hex_bytes {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let trimmed = raw.strip_prefix("0x").unwrap_or(&raw);
        hex::decode(trimmed).map_err(serde::de::Error::custom)
    }
}
