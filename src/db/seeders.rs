//! Database seeders for built-in data.
//!
//! The space registry is generated deterministically from the configured lot
//! size and inserted idempotently, so reseeding on every startup is safe and
//! never touches the status of existing spaces.

use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use crate::parking::registry;

/// Seed the parking-space registry (runs on every startup).
pub async fn seed_spaces(pool: &SqlitePool, total_spaces: u32, section_size: u32) -> Result<()> {
    let slots = registry::generate(total_spaces, section_size);
    let now = Utc::now().to_rfc3339();

    let mut inserted = 0u32;
    for slot in &slots {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO parking_spaces (id, section, number, status, created_at, updated_at)
             VALUES (?, ?, ?, 'free', ?, ?)",
        )
        .bind(&slot.id)
        .bind(slot.section.to_string())
        .bind(slot.number as i64)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await?;
        inserted += result.rows_affected() as u32;
    }

    if inserted > 0 {
        info!("Seeded {} parking spaces ({} total)", inserted, slots.len());
    }
    Ok(())
}
