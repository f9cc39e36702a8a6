use crate::hex::{self, Hex};
use blake3::Hash;
use serde::{Deserialize, Serialize};

use std::{fmt::Display, str::FromStr};

/// An identifier for a stored record.
/// Under the hood, this is a [`blake3`] hash over the record's fields.
///
/// It is displayed in hexadecimal format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(Hash);

impl ObjectId {
    /// Hashes the given fields, in order, as one continuous byte stream.
    pub fn digest<'a, I>(fields: I) -> Self
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut hasher = blake3::Hasher::new();
        for field in fields {
            hasher.update(field);
        }
        ObjectId(hasher.finalize())
    }

    pub fn as_bytes(&self) -> &[u8; blake3::OUT_LEN] {
        self.0.as_bytes()
    }
}

impl Ord for ObjectId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.as_bytes().cmp(other.0.as_bytes())
    }
}

impl PartialOrd for ObjectId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let b: &[u8] = self.0.as_bytes();
        write!(f, "{}", Hex::from(b))
    }
}

impl FromStr for ObjectId {
    type Err = hex::InvalidHex;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes: Vec<u8> = s.parse::<Hex>()?.into();
        let bytes: [u8; blake3::OUT_LEN] = bytes
            .try_into()
            .map_err(|_| hex::InvalidHex(s.to_owned()))?;
        Ok(ObjectId(Hash::from(bytes)))
    }
}

impl Serialize for ObjectId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_string().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s: String = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[test]
fn test_digest_is_field_order_sensitive() {
    let a = ObjectId::digest([&b"left"[..], &b"right"[..]]);
    let b = ObjectId::digest([&b"left"[..], &b"right"[..]]);
    let c = ObjectId::digest([&b"right"[..], &b"left"[..]]);
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn test_display_parse() {
    let id = ObjectId::digest([&b"hello, world"[..]]);
    let s = id.to_string();
    assert_eq!(s.len(), 64);
    assert_eq!(s.parse::<ObjectId>().unwrap(), id);
    assert!(s[..10].parse::<ObjectId>().is_err());
}

#[test]
fn test_serializes_as_hex_string() {
    let id = ObjectId::digest([&b"x"[..]]);
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{}\"", id));
    assert_eq!(serde_json::from_str::<ObjectId>(&json).unwrap(), id);
}
