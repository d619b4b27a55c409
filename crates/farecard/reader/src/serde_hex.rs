//! Serialize byte strings as hex, for readable snapshots

use hex::{FromHex, ToHex};
use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

pub(crate) fn serialize<S, T>(bytes: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: AsRef<[u8]>,
{
    serializer.serialize_str(&bytes.encode_hex_upper::<String>())
}

pub(crate) fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromHex,
    <T as FromHex>::Error: std::fmt::Display,
{
    let s = String::deserialize(deserializer)?;
    T::from_hex(s).map_err(D::Error::custom)
}
