use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::info;

use crate::error::{AppError, Validator};
use crate::geo::{self, BoundingBox, Coordinate, MERGE_RADIUS_KM};
use crate::models::location::TYPE_USER_ADDED;
use crate::models::{Location, Visit, VisitType};
use crate::services::locations::{insert_location, name_error, record_visit, NewLocation};
use crate::services::nearby::{fetch_candidates, within_radius};

#[derive(Debug, Clone, Deserialize)]
pub struct LogVisit {
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
    #[serde(rename = "type")]
    pub visit_type: VisitType,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoggedVisit {
    pub location: Location,
    pub visit: Visit,
}

fn validate(input: &LogVisit) -> Result<(), AppError> {
    let mut v = Validator::new();
    v.check("latitude", geo::latitude_error(input.latitude))
        .check("longitude", geo::longitude_error(input.longitude))
        .check("name", name_error(&input.name))
        .check(
            "type",
            (!input.visit_type.is_loggable())
                .then_some("The type must be one of viewed, selected, visited"),
        );
    v.finish()
}

/// Records a visit at a coordinate, reusing the nearest location within
/// [`MERGE_RADIUS_KM`] or creating a `user_added` one.
///
/// `placement` serializes find-or-create across requests in this process,
/// and the lookup and inserts share one transaction.
pub async fn log_visit(
    db: &SqlitePool,
    placement: &Mutex<()>,
    input: LogVisit,
    user_id: Option<&str>,
) -> Result<LoggedVisit, AppError> {
    validate(&input)?;

    let center = Coordinate::new(input.latitude, input.longitude);
    let bbox = BoundingBox::around(center, MERGE_RADIUS_KM);

    let _placement = placement.lock().await;
    let mut tx = db.begin().await?;

    let candidates = fetch_candidates(&mut *tx, Some(bbox)).await?;
    let existing = within_radius(center, MERGE_RADIUS_KM, candidates)
        .into_iter()
        .next()
        .map(|(location, _)| location);

    let location = match existing {
        Some(location) => {
            info!(location_id = location.id, "Existing location found");
            location
        }
        None => {
            let new = NewLocation {
                name: input.name,
                latitude: input.latitude,
                longitude: input.longitude,
                description: None,
                location_type: TYPE_USER_ADDED.to_string(),
            };
            let location = insert_location(&mut *tx, &new).await?;
            info!(location_id = location.id, "No nearby location found, created a new one");
            location
        }
    };

    let visit = record_visit(&mut *tx, location.id, user_id, input.visit_type).await?;
    tx.commit().await?;

    info!(
        location_id = location.id,
        visit_id = visit.id,
        visit_type = %visit.visit_type,
        "Visit logged"
    );

    Ok(LoggedVisit { location, visit })
}
