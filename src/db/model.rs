//! Database view models returned by repositories.
//!
//! Keep these structs focused on the data returned by queries. Business logic
//! should live in higher layers.

use serde::{Deserialize, Serialize};

/// Post slice used by the poll loop and the unclassified listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct PendingPost {
    pub id: i64,
    #[serde(rename = "post")]
    #[sqlx(rename = "post")]
    pub text: String,
}
