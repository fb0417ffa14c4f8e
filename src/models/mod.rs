//! Wire types exchanged with the chat backend.

mod agent;
mod auth;
mod chat;
mod knowledge_base;
mod user;

pub use agent::{Agent, AgentListing};
pub use auth::Tokens;
pub use chat::{
    Author, ChatMessage, ChatMessageFile, ChatSession, ChatSessionHeader, NEW_CHAT_ID,
};
pub use knowledge_base::KnowledgeBaseItem;
pub use user::{User, UserHeader};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Helper to deserialize an optional id as either string or integer
pub(crate) fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    use std::fmt;

    struct IdVisitor;

    impl<'de> Visitor<'de> for IdVisitor {
        type Value = Option<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string, an integer or null")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(value))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(IdVisitor)
}

/// Helper to deserialize nullable fields as their default value
/// Handles both missing fields (with `#[serde(default)]`) and explicit null values
pub(crate) fn deserialize_null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(|opt| opt.unwrap_or_default())
}

/// Helper to deserialize timestamps with or without a UTC offset.
/// Offset-less timestamps (as Python's `datetime.isoformat` emits them) are taken as UTC.
pub(crate) fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[derive(Deserialize)]
    struct Stamp {
        #[serde(deserialize_with = "deserialize_timestamp")]
        at: DateTime<Utc>,
    }

    #[derive(Deserialize)]
    struct Id {
        #[serde(default, deserialize_with = "deserialize_optional_id")]
        id: Option<String>,
    }

    #[test]
    fn test_timestamp_with_offset() {
        let stamp: Stamp = serde_json::from_str(r#"{"at":"2024-05-01T12:30:00+02:00"}"#).unwrap();
        assert_eq!(stamp.at.hour(), 10);
    }

    #[test]
    fn test_timestamp_without_offset() {
        let stamp: Stamp =
            serde_json::from_str(r#"{"at":"2024-05-01T12:30:00.123456"}"#).unwrap();
        assert_eq!(stamp.at.day(), 1);
        assert_eq!(stamp.at.hour(), 12);
    }

    #[test]
    fn test_timestamp_garbage() {
        assert!(serde_json::from_str::<Stamp>(r#"{"at":"yesterday"}"#).is_err());
    }

    #[test]
    fn test_id_string_int_null_missing() {
        let id: Id = serde_json::from_str(r#"{"id":"abc"}"#).unwrap();
        assert_eq!(id.id.as_deref(), Some("abc"));
        let id: Id = serde_json::from_str(r#"{"id":7}"#).unwrap();
        assert_eq!(id.id.as_deref(), Some("7"));
        let id: Id = serde_json::from_str(r#"{"id":null}"#).unwrap();
        assert_eq!(id.id, None);
        let id: Id = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(id.id, None);
    }
}
