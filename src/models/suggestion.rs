use serde::{Deserialize, Serialize};

/// Prefill hint derived from a catalog lookup. Never persisted as-is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub title: String,
    pub author: String,
    pub total_pages: u32,
}
