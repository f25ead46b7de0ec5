//! Serde helpers for snowflake IDs.
//!
//! IDs are written as strings. Older data files stored them as JSON numbers,
//! so both forms are accepted when reading. Zero is never a valid snowflake
//! and is rejected.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serializer};
use std::fmt;

struct IdVisitor;

fn nonzero<E: de::Error>(value: u64) -> Result<u64, E> {
    if value == 0 {
        Err(E::invalid_value(de::Unexpected::Unsigned(0), &"a non-zero snowflake ID"))
    } else {
        Ok(value)
    }
}

impl Visitor<'_> for IdVisitor {
    type Value = u64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a snowflake ID as a string or an unsigned integer")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<u64, E> {
        nonzero(value)
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<u64, E> {
        u64::try_from(value)
            .map_err(|_| E::custom(format!("negative ID: {value}")))
            .and_then(nonzero)
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<u64, E> {
        value
            .trim()
            .parse()
            .map_err(|_| E::custom(format!("invalid ID: {value:?}")))
            .and_then(nonzero)
    }
}

/// `#[serde(with = "ids::required")]` for plain `u64` IDs
pub mod required {
    use super::*;

    pub fn serialize<S: Serializer>(id: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(id)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        deserializer.deserialize_any(IdVisitor)
    }
}

/// `#[serde(with = "ids::optional")]` for `Option<u64>` IDs
pub mod optional {
    use super::*;

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(id: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
        match id {
            Some(id) => serializer.collect_str(id),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<u64>, D::Error> {
        #[derive(Deserialize)]
        struct Wrapper(#[serde(with = "super::required")] u64);

        Option::<Wrapper>::deserialize(deserializer).map(|wrapper| wrapper.map(|Wrapper(id)| id))
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        #[serde(with = "super::required")]
        id: u64,
        #[serde(default, with = "super::optional", skip_serializing_if = "Option::is_none")]
        other: Option<u64>,
    }

    #[test]
    fn test_ids_written_as_strings() {
        let json = serde_json::to_string(&Sample {
            id: 123,
            other: Some(456),
        })
        .unwrap();
        assert_eq!(json, r#"{"id":"123","other":"456"}"#);
    }

    #[test]
    fn test_numeric_ids_accepted() {
        let sample: Sample = serde_json::from_str(r#"{"id":123,"other":456}"#).unwrap();
        assert_eq!(
            sample,
            Sample {
                id: 123,
                other: Some(456)
            }
        );
    }

    #[test]
    fn test_missing_and_null_optional() {
        let sample: Sample = serde_json::from_str(r#"{"id":"1"}"#).unwrap();
        assert_eq!(sample.other, None);
        let sample: Sample = serde_json::from_str(r#"{"id":"1","other":null}"#).unwrap();
        assert_eq!(sample.other, None);
    }

    #[test]
    fn test_garbage_id_rejected() {
        assert!(serde_json::from_str::<Sample>(r#"{"id":"abc"}"#).is_err());
        assert!(serde_json::from_str::<Sample>(r#"{"id":-4}"#).is_err());
    }

    #[test]
    fn test_zero_id_rejected() {
        assert!(serde_json::from_str::<Sample>(r#"{"id":0}"#).is_err());
        assert!(serde_json::from_str::<Sample>(r#"{"id":"0"}"#).is_err());
        assert!(serde_json::from_str::<Sample>(r#"{"id":"1","other":"0"}"#).is_err());
        assert!(serde_json::from_str::<Sample>(r#"{"id":"1","other":0}"#).is_err());
    }
}
