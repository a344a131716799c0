use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::geo::Coordinate;

pub const TYPE_POINT_OF_INTEREST: &str = "point_of_interest";
pub const TYPE_USER_ADDED: &str = "user_added";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Location {
    pub id: i64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub description: Option<String>,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub location_type: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Location {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// A location together with its visit and rating summary.
#[derive(Debug, Clone, Serialize)]
pub struct LocationWithStats {
    #[serde(flatten)]
    pub location: Location,
    pub average_rating: f64,
    pub visit_count: i64,
}

/// A proximity search hit.
#[derive(Debug, Clone, Serialize)]
pub struct NearbyLocation {
    #[serde(flatten)]
    pub location: Location,
    pub distance: f64,
    pub visit_count: i64,
    pub average_rating: f64,
}
