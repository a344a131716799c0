//! Per-location visit and rating summaries, recomputed on every request.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::warn;

use crate::error::AppError;
use crate::models::{Location, RecentComment, VisitType};
use crate::services::locations::get_location;

pub const TRAILING_DAYS: i64 = 30;
pub const RECENT_COMMENT_LIMIT: i64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyVisits {
    pub date: NaiveDate,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Analytics {
    pub location: Location,
    pub visits_total: i64,
    pub visits_by_type: BTreeMap<VisitType, i64>,
    pub visits_over_time: Vec<DailyVisits>,
    pub average_rating: f64,
    pub rating_distribution: BTreeMap<i64, i64>,
    pub recent_comments: Vec<RecentComment>,
}

pub async fn location_analytics(
    db: &SqlitePool,
    location_id: i64,
    now: DateTime<Utc>,
) -> Result<Analytics, AppError> {
    let location = get_location(db, location_id).await?;

    let visits_total: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM location_visits WHERE location_id = ?")
            .bind(location_id)
            .fetch_one(db)
            .await?;

    let by_type: Vec<(VisitType, i64)> = sqlx::query_as(
        r#"
        SELECT type, COUNT(*) FROM location_visits
        WHERE location_id = ?
        GROUP BY type
        "#,
    )
    .bind(location_id)
    .fetch_all(db)
    .await?;

    let since = now - Duration::days(TRAILING_DAYS);
    // Loose text prefilter; the exact cutoff is applied after parsing.
    let recent: Vec<(String,)> = sqlx::query_as(
        "SELECT created_at FROM location_visits WHERE location_id = ? AND created_at >= ?",
    )
    .bind(location_id)
    .bind((since - Duration::days(1)).to_rfc3339())
    .fetch_all(db)
    .await?;

    let average_rating: (f64,) = sqlx::query_as(
        "SELECT CAST(COALESCE(AVG(rating), 0) AS REAL) FROM location_ratings WHERE location_id = ?",
    )
    .bind(location_id)
    .fetch_one(db)
    .await?;

    let distribution: Vec<(i64, i64)> = sqlx::query_as(
        r#"
        SELECT rating, COUNT(*) FROM location_ratings
        WHERE location_id = ?
        GROUP BY rating
        "#,
    )
    .bind(location_id)
    .fetch_all(db)
    .await?;

    let recent_comments: Vec<RecentComment> = sqlx::query_as(
        r#"
        SELECT r.id, r.user_id, u.name AS user_name, r.rating, r.comment, r.created_at
        FROM location_ratings r
        JOIN users u ON u.id = r.user_id
        WHERE r.location_id = ?
          AND r.comment IS NOT NULL
          AND TRIM(r.comment) <> ''
        ORDER BY r.created_at DESC, r.id DESC
        LIMIT ?
        "#,
    )
    .bind(location_id)
    .bind(RECENT_COMMENT_LIMIT)
    .fetch_all(db)
    .await?;

    Ok(Analytics {
        location,
        visits_total: visits_total.0,
        visits_by_type: by_type.into_iter().collect(),
        visits_over_time: bucket_by_day(recent.iter().map(|(ts,)| ts.as_str()), since),
        average_rating: average_rating.0,
        rating_distribution: distribution.into_iter().collect(),
        recent_comments,
    })
}

/// Counts timestamps at or after `since` per UTC calendar date, oldest first.
/// Dates with no visits are omitted.
pub fn bucket_by_day<'a>(
    timestamps: impl IntoIterator<Item = &'a str>,
    since: DateTime<Utc>,
) -> Vec<DailyVisits> {
    let mut days: BTreeMap<NaiveDate, i64> = BTreeMap::new();

    for raw in timestamps {
        let at = match DateTime::parse_from_rfc3339(raw) {
            Ok(at) => at.with_timezone(&Utc),
            Err(e) => {
                warn!(timestamp = raw, error = %e, "Skipping visit with unreadable timestamp");
                continue;
            }
        };
        if at < since {
            continue;
        }
        *days.entry(at.date_naive()).or_default() += 1;
    }

    days.into_iter()
        .map(|(date, count)| DailyVisits { date, count })
        .collect()
}
