use serde::{Deserialize, Serialize};

/// Label stored when the classifier produced nothing usable.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Full post record as stored in the `posts` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    #[serde(rename = "post")]
    #[sqlx(rename = "post")]
    pub text: String,
    pub category: Option<String>,
    pub response: Option<String>,
}

/// Outcome of one classifier invocation: the parsed label and the raw text it
/// was parsed from (`None` when the invocation failed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: String,
    pub response: Option<String>,
}

impl Classification {
    pub fn failed() -> Self {
        Self {
            category: UNKNOWN_CATEGORY.to_string(),
            response: None,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.response.is_none()
    }
}

/// Result record for a post the poll loop just classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedPost {
    pub post_id: i64,
    pub category: String,
    pub response: Option<String>,
}
