use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AdminError;

/// Both account addresses and object ids are 32-byte values rendered as
/// `0x`-prefixed lowercase hex.
pub const ID_LEN: usize = 32;

fn parse_hex32(kind: &str, s: &str) -> Result<[u8; ID_LEN], AdminError> {
    let digits = s.trim().strip_prefix("0x").unwrap_or(s.trim());
    let bytes =
        hex::decode(digits).map_err(|e| AdminError::Config(format!("invalid {kind} {s}: {e}")))?;
    if bytes.len() != ID_LEN {
        return Err(AdminError::Config(format!(
            "invalid {kind} {s}: expected {ID_LEN} bytes, got {}",
            bytes.len()
        )));
    }
    let mut out = [0u8; ID_LEN];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// An on-chain account address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Address([u8; ID_LEN]);

impl Address {
    pub const fn new(bytes: [u8; ID_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self, AdminError> {
        parse_hex32("address", s).map(Self)
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Identifier of an on-chain object (package, capability, shared state).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectId([u8; ID_LEN]);

impl ObjectId {
    pub const fn new(bytes: [u8; ID_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self, AdminError> {
        parse_hex32("object id", s).map(Self)
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(de::Error::custom)
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ObjectId::from_hex(&s).map_err(de::Error::custom)
    }
}
