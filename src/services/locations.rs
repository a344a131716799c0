use chrono::Utc;
use serde::{Deserialize, Deserializer};
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::info;

use crate::error::{AppError, Validator};
use crate::geo;
use crate::models::location::TYPE_POINT_OF_INTEREST;
use crate::models::{Location, LocationWithStats, Visit, VisitType};

const MAX_NAME_LEN: usize = 255;

/// Fields for a location about to be inserted.
#[derive(Debug, Clone)]
pub struct NewLocation {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub description: Option<String>,
    pub location_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLocation {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub location_type: Option<String>,
}

/// Partial update. Absent fields are left alone; `description: null` clears
/// the description.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateLocation {
    pub name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub description: Option<Option<String>>,
    #[serde(rename = "type")]
    pub location_type: Option<String>,
}

// Distinguishes a field sent as null from one that was never sent
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationStats {
    pub visit_count: i64,
    pub average_rating: f64,
}

pub fn name_error(name: &str) -> Option<&'static str> {
    if name.trim().is_empty() {
        Some("Name is required")
    } else if name.chars().count() > MAX_NAME_LEN {
        Some("Name must be at most 255 characters")
    } else {
        None
    }
}

fn validate_create(input: &CreateLocation) -> Result<(), AppError> {
    let mut v = Validator::new();
    v.check("name", name_error(&input.name))
        .check("latitude", geo::latitude_error(input.latitude))
        .check("longitude", geo::longitude_error(input.longitude));
    v.finish()
}

fn validate_update(input: &UpdateLocation) -> Result<(), AppError> {
    let mut v = Validator::new();
    v.check("name", input.name.as_deref().and_then(name_error))
        .check("latitude", input.latitude.and_then(geo::latitude_error))
        .check("longitude", input.longitude.and_then(geo::longitude_error));
    v.finish()
}

pub async fn insert_location<'e, E>(executor: E, new: &NewLocation) -> Result<Location, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = Utc::now().to_rfc3339();

    sqlx::query_as(
        r#"
        INSERT INTO locations (name, latitude, longitude, description, type, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(new.name.trim())
    .bind(new.latitude)
    .bind(new.longitude)
    .bind(&new.description)
    .bind(&new.location_type)
    .bind(&now)
    .bind(&now)
    .fetch_one(executor)
    .await
}

pub async fn record_visit<'e, E>(
    executor: E,
    location_id: i64,
    user_id: Option<&str>,
    visit_type: VisitType,
) -> Result<Visit, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = Utc::now().to_rfc3339();

    sqlx::query_as(
        r#"
        INSERT INTO location_visits (location_id, user_id, type, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(location_id)
    .bind(user_id)
    .bind(visit_type)
    .bind(&now)
    .bind(&now)
    .fetch_one(executor)
    .await
}

pub async fn location_stats(db: &SqlitePool, location_id: i64) -> Result<LocationStats, sqlx::Error> {
    let visit_count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM location_visits WHERE location_id = ?")
            .bind(location_id)
            .fetch_one(db)
            .await?;

    let average_rating: (f64,) = sqlx::query_as(
        "SELECT CAST(COALESCE(AVG(rating), 0) AS REAL) FROM location_ratings WHERE location_id = ?",
    )
    .bind(location_id)
    .fetch_one(db)
    .await?;

    Ok(LocationStats {
        visit_count: visit_count.0,
        average_rating: average_rating.0,
    })
}

pub async fn list_locations(db: &SqlitePool) -> Result<Vec<Location>, AppError> {
    let locations: Vec<Location> = sqlx::query_as("SELECT * FROM locations ORDER BY id")
        .fetch_all(db)
        .await?;
    Ok(locations)
}

pub async fn get_location(db: &SqlitePool, id: i64) -> Result<Location, AppError> {
    sqlx::query_as("SELECT * FROM locations WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFound)
}

/// Creates a location and, for a signed-in caller, records a `created` visit.
pub async fn create_location(
    db: &SqlitePool,
    input: CreateLocation,
    user_id: Option<&str>,
) -> Result<Location, AppError> {
    validate_create(&input)?;

    let new = NewLocation {
        name: input.name,
        latitude: input.latitude,
        longitude: input.longitude,
        description: input.description,
        location_type: input
            .location_type
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| TYPE_POINT_OF_INTEREST.to_string()),
    };

    let mut tx = db.begin().await?;
    let location = insert_location(&mut *tx, &new).await?;
    if let Some(user_id) = user_id {
        record_visit(&mut *tx, location.id, Some(user_id), VisitType::Created).await?;
    }
    tx.commit().await?;

    info!(location_id = location.id, "Location created");
    Ok(location)
}

/// Loads a location with its summary; a signed-in caller's view is logged
/// after the counts are taken.
pub async fn show_location(
    db: &SqlitePool,
    id: i64,
    user_id: Option<&str>,
) -> Result<LocationWithStats, AppError> {
    let location = get_location(db, id).await?;
    let stats = location_stats(db, id).await?;

    if let Some(user_id) = user_id {
        record_visit(db, id, Some(user_id), VisitType::Viewed).await?;
    }

    Ok(LocationWithStats {
        location,
        average_rating: stats.average_rating,
        visit_count: stats.visit_count,
    })
}

pub async fn update_location(
    db: &SqlitePool,
    id: i64,
    input: UpdateLocation,
) -> Result<Location, AppError> {
    validate_update(&input)?;

    let mut location = get_location(db, id).await?;

    if let Some(name) = input.name {
        location.name = name.trim().to_string();
    }
    if let Some(latitude) = input.latitude {
        location.latitude = latitude;
    }
    if let Some(longitude) = input.longitude {
        location.longitude = longitude;
    }
    if let Some(description) = input.description {
        location.description = description;
    }
    if let Some(location_type) = input.location_type.filter(|t| !t.trim().is_empty()) {
        location.location_type = location_type;
    }

    let updated: Location = sqlx::query_as(
        r#"
        UPDATE locations
        SET name = ?, latitude = ?, longitude = ?, description = ?, type = ?, updated_at = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(&location.name)
    .bind(location.latitude)
    .bind(location.longitude)
    .bind(&location.description)
    .bind(&location.location_type)
    .bind(Utc::now().to_rfc3339())
    .bind(id)
    .fetch_optional(db)
    .await?
    .ok_or(AppError::NotFound)?;

    Ok(updated)
}

pub async fn delete_location(db: &SqlitePool, id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM locations WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    info!(location_id = id, "Location deleted");
    Ok(())
}
