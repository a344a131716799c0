use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
pub enum VisitType {
    #[serde(rename = "viewed")]
    #[sqlx(rename = "viewed")]
    Viewed,
    #[serde(rename = "selected")]
    #[sqlx(rename = "selected")]
    Selected,
    #[serde(rename = "visited")]
    #[sqlx(rename = "visited")]
    Visited,
    #[serde(rename = "created")]
    #[sqlx(rename = "created")]
    Created,
}

impl VisitType {
    /// Whether a client may report this type through the visit log.
    /// `created` is only ever recorded by the server.
    pub fn is_loggable(self) -> bool {
        !matches!(self, VisitType::Created)
    }
}

impl std::fmt::Display for VisitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VisitType::Viewed => write!(f, "viewed"),
            VisitType::Selected => write!(f, "selected"),
            VisitType::Visited => write!(f, "visited"),
            VisitType::Created => write!(f, "created"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Visit {
    pub id: i64,
    pub location_id: i64,
    pub user_id: Option<String>,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub visit_type: VisitType,
    pub created_at: String,
    pub updated_at: String,
}
