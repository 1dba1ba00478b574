//! Serde adapters for id fields.
//!
//! The gateway reports numeric ids (`user_id`, `group_id`, `message_id`,
//! `self_id`, …) as JSON numbers. None of them are arithmetic quantities,
//! so they are stored and compared as strings everywhere inside the
//! framework. These modules accept either representation on decode and
//! always emit strings on encode.

use serde::{Deserialize, Deserializer, Serializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrInt {
    String(String),
    Int(i64),
}

impl StringOrInt {
    fn into_string(self) -> String {
        match self {
            Self::String(s) => s,
            Self::Int(i) => i.to_string(),
        }
    }
}

/// `#[serde(with = "ids::string_or_int")]` for required id fields.
pub mod string_or_int {
    use super::*;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(StringOrInt::deserialize(deserializer)?.into_string())
    }

    pub fn serialize<S: Serializer>(value: &String, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value)
    }
}

/// `#[serde(with = "ids::opt_string_or_int")]` for optional id fields.
pub mod opt_string_or_int {
    use super::*;

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        let value = Option::<StringOrInt>::deserialize(deserializer)?;
        Ok(value.map(StringOrInt::into_string))
    }

    pub fn serialize<S: Serializer>(
        value: &Option<String>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_str(v),
            None => serializer.serialize_none(),
        }
    }
}

/// `#[serde(with = "ids::lenient_f64")]`: accepts a number or a numeric
/// string (the gateway is inconsistent about coordinates).
pub mod lenient_f64 {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum F64OrString {
        F64(f64),
        String(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match F64OrString::deserialize(deserializer)? {
            F64OrString::F64(f) => Ok(f),
            F64OrString::String(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(*value)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Probe {
        #[serde(with = "crate::ids::string_or_int")]
        user_id: String,
        #[serde(default, with = "crate::ids::opt_string_or_int")]
        group_id: Option<String>,
    }

    #[test]
    fn numeric_ids_become_strings() {
        let p: Probe = serde_json::from_str(r#"{"user_id": 123456, "group_id": 654321}"#).unwrap();
        assert_eq!(p.user_id, "123456");
        assert_eq!(p.group_id.as_deref(), Some("654321"));
    }

    #[test]
    fn string_ids_pass_through() {
        let p: Probe = serde_json::from_str(r#"{"user_id": "123456"}"#).unwrap();
        assert_eq!(p.user_id, "123456");
        assert_eq!(p.group_id, None);
    }

    #[test]
    fn ids_serialize_as_strings() {
        let p = Probe {
            user_id: "7".into(),
            group_id: Some("8".into()),
        };
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["user_id"], "7");
        assert_eq!(v["group_id"], "8");
    }
}
