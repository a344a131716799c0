use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Rating {
    pub id: i64,
    pub location_id: i64,
    pub user_id: String,
    pub rating: i64,
    pub comment: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Rating comment joined with its author's display name.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RecentComment {
    pub id: i64,
    pub user_id: String,
    pub user_name: String,
    pub rating: i64,
    pub comment: String,
    pub created_at: String,
}
