use serde::Deserialize;
use sqlx::SqlitePool;
use std::fs;
use uuid::Uuid;

use crate::geo::{self, BoundingBox, Coordinate, MERGE_RADIUS_KM};
use crate::models::location::TYPE_POINT_OF_INTEREST;
use crate::services::locations::{insert_location, name_error, NewLocation};
use crate::services::nearby::{fetch_candidates, within_radius};

#[derive(Deserialize)]
struct SeedLocation {
    name: String,
    #[serde(alias = "lat")]
    latitude: f64,
    #[serde(alias = "lng", alias = "lon")]
    longitude: f64,
    description: Option<String>,
    #[serde(rename = "type")]
    location_type: Option<String>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub merged: usize,
    pub invalid: usize,
}

/// Seeds locations from a JSON array. Entries within the merge radius of a
/// location already on file (or earlier in the same file) are skipped.
pub async fn import_locations(
    pool: &SqlitePool,
    file_path: &str,
) -> Result<ImportSummary, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(file_path)?;
    let seeds: Vec<SeedLocation> = serde_json::from_str(&content)?;

    let mut summary = ImportSummary::default();
    let mut tx = pool.begin().await?;

    for seed in seeds {
        if name_error(&seed.name).is_some()
            || geo::latitude_error(seed.latitude).is_some()
            || geo::longitude_error(seed.longitude).is_some()
        {
            eprintln!("Skipping invalid location: {}", seed.name);
            summary.invalid += 1;
            continue;
        }

        let center = Coordinate::new(seed.latitude, seed.longitude);
        let candidates =
            fetch_candidates(&mut *tx, Some(BoundingBox::around(center, MERGE_RADIUS_KM))).await?;
        if !within_radius(center, MERGE_RADIUS_KM, candidates).is_empty() {
            summary.merged += 1;
            continue;
        }

        let new = NewLocation {
            name: seed.name,
            latitude: seed.latitude,
            longitude: seed.longitude,
            description: seed.description,
            location_type: seed
                .location_type
                .unwrap_or_else(|| TYPE_POINT_OF_INTEREST.to_string()),
        };
        insert_location(&mut *tx, &new).await?;
        summary.imported += 1;
    }

    tx.commit().await?;
    println!(
        "Imported {} locations ({} already known, {} invalid)",
        summary.imported, summary.merged, summary.invalid
    );
    Ok(summary)
}

pub async fn create_user(pool: &SqlitePool, name: &str, email: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let id = Uuid::new_v4().to_string();
    let invite_code = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        "INSERT INTO users (id, name, email, invite_code, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)"
    )
    .bind(&id)
    .bind(name)
    .bind(email)
    .bind(&invite_code)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    println!("Created user:");
    println!("  ID: {}", id);
    println!("  Name: {}", name);
    println!("  Invite Code: {}", invite_code);

    Ok(())
}
