use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::{AppError, Validator};
use crate::models::Rating;

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

#[derive(Debug, Clone, Deserialize)]
pub struct RateLocation {
    pub location_id: i64,
    pub rating: i64,
    pub comment: Option<String>,
}

fn rating_error(rating: i64) -> Option<&'static str> {
    (!(MIN_RATING..=MAX_RATING).contains(&rating)).then_some("The rating must be between 1 and 5")
}

/// Stores `user_id`'s rating of a location, replacing any earlier one.
///
/// A resubmission without a comment keeps the comment already on file.
/// The unique `(location_id, user_id)` index makes this a single atomic
/// upsert, so concurrent first ratings cannot produce two rows. A location
/// that is missing when the row is written is reported as a `location_id`
/// error.
pub async fn rate_location(
    db: &SqlitePool,
    user_id: &str,
    input: RateLocation,
) -> Result<Rating, AppError> {
    let mut v = Validator::new();
    v.check("rating", rating_error(input.rating));
    v.finish()?;

    let comment = input.comment.filter(|c| !c.trim().is_empty());
    let now = Utc::now().to_rfc3339();

    let result: Result<Rating, sqlx::Error> = sqlx::query_as(
        r#"
        INSERT INTO location_ratings (location_id, user_id, rating, comment, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT (location_id, user_id) DO UPDATE SET
            rating = excluded.rating,
            comment = COALESCE(excluded.comment, location_ratings.comment),
            updated_at = excluded.updated_at
        RETURNING *
        "#,
    )
    .bind(input.location_id)
    .bind(user_id)
    .bind(input.rating)
    .bind(&comment)
    .bind(&now)
    .bind(&now)
    .fetch_one(db)
    .await;

    let rating = match result {
        Ok(rating) => rating,
        Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
            return Err(missing_reference(db, input.location_id).await);
        }
        Err(e) => return Err(e.into()),
    };

    info!(
        location_id = rating.location_id,
        rating_id = rating.id,
        rating = rating.rating,
        "Location rated"
    );
    Ok(rating)
}

// Either the location or the rating user is gone
async fn missing_reference(db: &SqlitePool, location_id: i64) -> AppError {
    let exists: Result<(i64,), sqlx::Error> =
        sqlx::query_as("SELECT COUNT(*) FROM locations WHERE id = ?")
            .bind(location_id)
            .fetch_one(db)
            .await;

    match exists {
        Ok((0,)) => AppError::invalid("location_id", "The selected location is invalid"),
        Ok(_) => AppError::Unauthenticated,
        Err(e) => e.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_range() {
        assert!(rating_error(0).is_some());
        assert!(rating_error(1).is_none());
        assert!(rating_error(5).is_none());
        assert!(rating_error(6).is_some());
    }
}
