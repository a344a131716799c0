//! Proximity search over the location table.
//!
//! Both strategies read candidates ordered by id and hand them to
//! [`within_radius`], so the haversine check and the sort are shared and the
//! two strategies can only differ in how many rows they pull from SQLite.

use std::fmt;
use std::str::FromStr;

use sqlx::{SqliteExecutor, SqlitePool};
use tracing::{error, info};

use crate::error::{AppError, Validator};
use crate::geo::{self, BoundingBox, Coordinate, DEFAULT_RADIUS_KM};
use crate::models::{Location, NearbyLocation};
use crate::services::locations::location_stats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NearbyStrategy {
    /// Load every location and filter in process.
    Scan,
    /// Narrow with a bounding box in SQL, then filter in process.
    #[default]
    Query,
}

impl FromStr for NearbyStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scan" => Ok(NearbyStrategy::Scan),
            "query" => Ok(NearbyStrategy::Query),
            other => Err(format!("unknown nearby strategy '{other}', expected scan or query")),
        }
    }
}

impl fmt::Display for NearbyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NearbyStrategy::Scan => write!(f, "scan"),
            NearbyStrategy::Query => write!(f, "query"),
        }
    }
}

/// A validated proximity request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearbyQuery {
    pub center: Coordinate,
    pub radius_km: f64,
}

impl NearbyQuery {
    pub fn new(
        latitude: Option<f64>,
        longitude: Option<f64>,
        radius_km: Option<f64>,
    ) -> Result<Self, AppError> {
        let radius_km = radius_km.unwrap_or(DEFAULT_RADIUS_KM);

        let mut v = Validator::new();
        v.check("lat", latitude.is_none().then_some("The lat field is required"))
            .check("lat", latitude.and_then(geo::latitude_error))
            .check("lng", longitude.is_none().then_some("The lng field is required"))
            .check("lng", longitude.and_then(geo::longitude_error))
            .check("radius", geo::radius_error(radius_km));
        v.finish()?;

        let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
            return Err(AppError::invalid("lat", "The lat field is required"));
        };

        Ok(Self {
            center: Coordinate::new(latitude, longitude),
            radius_km,
        })
    }

    /// Builds a query from raw query-string values. Blank values count as
    /// absent; anything else must read as a number.
    pub fn parse(
        latitude: Option<&str>,
        longitude: Option<&str>,
        radius_km: Option<&str>,
    ) -> Result<Self, AppError> {
        let mut v = Validator::new();
        let latitude = parse_number(&mut v, "lat", latitude);
        let longitude = parse_number(&mut v, "lng", longitude);
        let radius_km = parse_number(&mut v, "radius", radius_km);
        v.finish()?;

        Self::new(latitude, longitude, radius_km)
    }
}

fn parse_number(v: &mut Validator, field: &str, raw: Option<&str>) -> Option<f64> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match raw.parse::<f64>() {
        Ok(value) => Some(value),
        Err(_) => {
            v.check(field, Some(&format!("The {field} must be a number")));
            None
        }
    }
}

/// Result of a proximity search.
///
/// `Degraded` means the lookup failed internally. Callers that only need a
/// list treat it as empty; the HTTP layer also flags it in a response header.
#[derive(Debug)]
pub enum NearbyOutcome {
    Found(Vec<NearbyLocation>),
    Degraded,
}

impl NearbyOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, NearbyOutcome::Degraded)
    }

    pub fn into_locations(self) -> Vec<NearbyLocation> {
        match self {
            NearbyOutcome::Found(locations) => locations,
            NearbyOutcome::Degraded => Vec::new(),
        }
    }
}

pub async fn find_nearby(
    db: &SqlitePool,
    query: NearbyQuery,
    strategy: NearbyStrategy,
) -> NearbyOutcome {
    info!(
        latitude = query.center.latitude,
        longitude = query.center.longitude,
        radius_km = query.radius_km,
        %strategy,
        "Searching for nearby locations"
    );

    match try_find_nearby(db, query, strategy).await {
        Ok(locations) => {
            info!(count = locations.len(), "Nearby locations found");
            NearbyOutcome::Found(locations)
        }
        Err(e) => {
            error!(
                error = %e,
                latitude = query.center.latitude,
                longitude = query.center.longitude,
                radius_km = query.radius_km,
                "Failed to find nearby locations"
            );
            NearbyOutcome::Degraded
        }
    }
}

async fn try_find_nearby(
    db: &SqlitePool,
    query: NearbyQuery,
    strategy: NearbyStrategy,
) -> Result<Vec<NearbyLocation>, sqlx::Error> {
    let bbox = match strategy {
        NearbyStrategy::Scan => None,
        NearbyStrategy::Query => Some(BoundingBox::around(query.center, query.radius_km)),
    };

    let candidates = fetch_candidates(db, bbox).await?;
    let hits = within_radius(query.center, query.radius_km, candidates);

    let mut results = Vec::with_capacity(hits.len());
    for (location, distance) in hits {
        let stats = location_stats(db, location.id).await?;
        results.push(NearbyLocation {
            location,
            distance,
            visit_count: stats.visit_count,
            average_rating: stats.average_rating,
        });
    }

    Ok(results)
}

/// Reads candidate rows ordered by id, optionally restricted to a box.
pub async fn fetch_candidates<'e, E>(
    executor: E,
    bbox: Option<BoundingBox>,
) -> Result<Vec<Location>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let Some(bbox) = bbox else {
        return sqlx::query_as("SELECT * FROM locations ORDER BY id")
            .fetch_all(executor)
            .await;
    };

    match bbox.longitude {
        Some((min_longitude, max_longitude)) => {
            sqlx::query_as(
                r#"
                SELECT * FROM locations
                WHERE latitude BETWEEN ? AND ?
                  AND longitude BETWEEN ? AND ?
                ORDER BY id
                "#,
            )
            .bind(bbox.min_latitude)
            .bind(bbox.max_latitude)
            .bind(min_longitude)
            .bind(max_longitude)
            .fetch_all(executor)
            .await
        }
        None => {
            sqlx::query_as(
                "SELECT * FROM locations WHERE latitude BETWEEN ? AND ? ORDER BY id",
            )
            .bind(bbox.min_latitude)
            .bind(bbox.max_latitude)
            .fetch_all(executor)
            .await
        }
    }
}

/// Keeps candidates within `radius_km` of `center`, nearest first.
///
/// The sort is stable, so equal distances keep the order the candidates came
/// in (id order for everything read by [`fetch_candidates`]).
pub fn within_radius(
    center: Coordinate,
    radius_km: f64,
    candidates: Vec<Location>,
) -> Vec<(Location, f64)> {
    let mut hits: Vec<(Location, f64)> = candidates
        .into_iter()
        .filter_map(|location| {
            let distance = geo::haversine_km(center, location.coordinate());
            (distance <= radius_km).then_some((location, distance))
        })
        .collect();

    hits.sort_by(|a, b| a.1.total_cmp(&b.1));
    hits
}
