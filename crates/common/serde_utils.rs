//! Serde helpers for the 0x-prefixed hex notation used in genesis files.

pub mod u64 {
    pub mod hex_str {
        use serde::{de::Error, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&format!("{value:#x}"))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
            let value = String::deserialize(deserializer)?;
            let trimmed = value.trim_start_matches("0x");
            u64::from_str_radix(trimmed, 16).map_err(D::Error::custom)
        }
    }

    /// Accepts both `"0x10"` and `"16"` on input, serializes as hex.
    pub mod hex_or_dec_str {
        use serde::{de::Error, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&format!("{value:#x}"))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
            let value = String::deserialize(deserializer)?;
            match value.strip_prefix("0x") {
                Some(hex) => u64::from_str_radix(hex, 16).map_err(D::Error::custom),
                None => value.parse().map_err(D::Error::custom),
            }
        }
    }
}

pub mod u256 {
    use ethereum_types::U256;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{value:#x}"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let value = String::deserialize(deserializer)?;
        match value.strip_prefix("0x") {
            Some(hex) => U256::from_str_radix(hex, 16).map_err(D::Error::custom),
            None => U256::from_dec_str(&value).map_err(D::Error::custom),
        }
    }
}

pub mod bytes {
    use ::bytes::Bytes;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(value)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let value = String::deserialize(deserializer)?;
        let bytes = hex::decode(value.trim_start_matches("0x")).map_err(D::Error::custom)?;
        Ok(Bytes::from(bytes))
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            value: &Option<Bytes>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(bytes) => super::serialize(bytes, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Bytes>, D::Error> {
            let value = Option::<String>::deserialize(deserializer)?;
            value
                .map(|value| {
                    hex::decode(value.trim_start_matches("0x"))
                        .map(Bytes::from)
                        .map_err(D::Error::custom)
                })
                .transpose()
        }
    }
}
