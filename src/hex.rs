use std::{fmt::Display, str::FromStr};

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// A valid, lowercase hexadecimal encoding of binary data.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Hex(String);

/// Returned when a string is not an even-length run of hex digits.
#[derive(PartialEq, Eq, Debug, Clone, Display)]
#[display(fmt = "invalid hex string: {:?}", _0)]
pub struct InvalidHex(pub String);

impl Hex {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Serialize for Hex {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Hex {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s: String = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Display for Hex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Hex {
    type Err = InvalidHex;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = s.len() % 2 == 0
            && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if valid {
            Ok(Hex(s.to_owned()))
        } else {
            Err(InvalidHex(s.to_owned()))
        }
    }
}

impl<'a> From<&'a [u8]> for Hex {
    fn from(bytes: &[u8]) -> Self {
        fn hex_digit(b: u8) -> char {
            match b {
                0..=9 => (b + b'0') as char,
                10..=15 => (b - 10 + b'a') as char,
                _ => unreachable!("bad hex digit"),
            }
        }

        let mut out = String::with_capacity(bytes.len() * 2);
        for &b in bytes {
            out.push(hex_digit(b >> 4));
            out.push(hex_digit(b & 0b00001111));
        }
        Hex(out)
    }
}

impl From<Hex> for Vec<u8> {
    fn from(value: Hex) -> Self {
        // Digits were validated on the way in.
        fn unhex_digit(h: u8) -> u8 {
            if h.is_ascii_digit() {
                h - b'0'
            } else {
                h - b'a' + 10
            }
        }

        value
            .0
            .as_bytes()
            .chunks_exact(2)
            .map(|pair| (unhex_digit(pair[0]) << 4) | unhex_digit(pair[1]))
            .collect()
    }
}

/// `#[serde(with = "crate::hex::bytes")]` support for storing raw bytes as a hex string.
pub mod bytes {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::Hex;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        Hex::from(bytes).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        Ok(Hex::deserialize(deserializer)?.into())
    }
}

#[test]
fn test_hex_round_trip() {
    let example: &[u8] = b"hello, world";
    let hex: Hex = Hex::from(example);
    assert_eq!(hex.as_str(), "68656c6c6f2c20776f726c64");
    let bytes: Vec<u8> = hex.into();
    assert_eq!(example, bytes.as_slice());
}

#[test]
fn test_hex_rejects_garbage() {
    assert!("abc".parse::<Hex>().is_err());
    assert!("zz".parse::<Hex>().is_err());
    assert!("AB".parse::<Hex>().is_err());
    assert!("".parse::<Hex>().is_ok());
}

#[test]
fn test_hex_deserialize() {
    let example: &[u8] = b"hello, world";
    let hex: Hex = Hex::from(example);
    let json = serde_json::to_vec(&hex).unwrap();
    let hex_: Hex = serde_json::from_slice(&json).unwrap();
    assert_eq!(hex, hex_);
    assert!(serde_json::from_str::<Hex>("\"0g\"").is_err());
}
