//! Serde adapter encoding binary file content as base64 on the wire.

use {
    base64::{Engine, engine::general_purpose::STANDARD},
    serde::{Deserialize, Deserializer, Serializer, de::Error as _},
};

pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(bytes))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    STANDARD.decode(encoded).map_err(D::Error::custom)
}
