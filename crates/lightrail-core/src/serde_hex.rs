//! Hex-string serde for raw byte fields in persisted snapshots.

use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S, T>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: AsRef<[u8]>,
{
    serializer.serialize_str(&hex::encode(value.as_ref()))
}

pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<Vec<u8>>,
{
    let encoded = String::deserialize(deserializer)?;
    let bytes = hex::decode(&encoded).map_err(serde::de::Error::custom)?;
    T::try_from(bytes).map_err(|_| serde::de::Error::custom("unexpected byte length"))
}
