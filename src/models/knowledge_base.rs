use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{deserialize_null_default, deserialize_optional_id};

/// Knowledge base entry.
///
/// The list endpoint returns headers only; `content` and `metadata` are then empty.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KnowledgeBaseItem {
    /// Assigned by the backend on create; older servers call it `id` and use integers
    #[serde(
        default,
        alias = "id",
        deserialize_with = "deserialize_optional_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub item_id: Option<String>,
    pub title: String,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub content: String,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub keywords: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub metadata: BTreeMap<String, String>,
}

impl KnowledgeBaseItem {
    /// Create an unsaved item.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Default::default()
        }
    }
}
