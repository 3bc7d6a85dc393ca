//! Lot statistics and dashboard helpers.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Local, TimeZone, Utc};
use serde::Deserialize;
use std::sync::Arc;

use crate::db::{ParkingSession, ParkingSpace, StatsResponse, User};
use crate::parking::pricing;
use crate::AppState;

use super::auth::require_admin;
use super::error::ApiError;

/// Occupancy and stay statistics; revenue aggregates only for admins.
///
/// GET /api/parking/statistics
pub async fn statistics(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<StatsResponse>, ApiError> {
    let total_spaces: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM parking_spaces")
        .fetch_one(&state.db)
        .await?;
    let occupied_spaces: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM parking_spaces WHERE status = 'occupied'")
            .fetch_one(&state.db)
            .await?;
    let free_spaces: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM parking_spaces WHERE status = 'free'")
            .fetch_one(&state.db)
            .await?;

    let entry_times: Vec<(String,)> =
        sqlx::query_as("SELECT entry_time FROM parking_sessions WHERE status = 'active'")
            .fetch_all(&state.db)
            .await?;
    let now = Utc::now();
    let entries: Vec<DateTime<Utc>> = entry_times
        .iter()
        .filter_map(|(t,)| DateTime::parse_from_rfc3339(t).ok())
        .map(|t| t.with_timezone(&Utc))
        .collect();
    let average_stay_time = pricing::format_duration(pricing::average_stay_minutes(&entries, now));

    let mut response = StatsResponse {
        total_spaces: total_spaces.0,
        occupied_spaces: occupied_spaces.0,
        free_spaces: free_spaces.0,
        occupancy_rate: pricing::occupancy_rate(total_spaces.0, occupied_spaces.0),
        average_stay_time,
        total_revenue: None,
        daily_revenue: None,
    };

    // Revenue figures are omitted entirely for regular users
    if require_admin(&user).is_ok() {
        let total: (Option<f64>,) =
            sqlx::query_as("SELECT SUM(cost) FROM parking_sessions WHERE status = 'completed'")
                .fetch_one(&state.db)
                .await?;
        let daily: (Option<f64>,) = sqlx::query_as(
            "SELECT SUM(cost) FROM parking_sessions
             WHERE status = 'completed' AND exit_time >= ?",
        )
        .bind(local_midnight_utc().to_rfc3339())
        .fetch_one(&state.db)
        .await?;

        response.total_revenue = Some(total.0.unwrap_or(0.0));
        response.daily_revenue = Some(daily.0.unwrap_or(0.0));
    }

    Ok(Json(response))
}

/// Start of the current local calendar day, in UTC for comparison against
/// stored RFC 3339 timestamps.
fn local_midnight_utc() -> DateTime<Utc> {
    let today = Local::now().date_naive();
    match today.and_hms_opt(0, 0, 0) {
        Some(naive) => match Local.from_local_datetime(&naive).earliest() {
            Some(midnight) => midnight.with_timezone(&Utc),
            None => Utc::now(),
        },
        None => Utc::now(),
    }
}

#[derive(Debug, Deserialize)]
pub struct RecentEntriesQuery {
    #[serde(default = "default_recent_limit")]
    pub limit: u32,
}

fn default_recent_limit() -> u32 {
    5
}

/// Latest check-ins, for the dashboard feed
///
/// GET /api/parking/recent-entries
pub async fn recent_entries(
    State(state): State<Arc<AppState>>,
    _user: User,
    Query(query): Query<RecentEntriesQuery>,
) -> Result<Json<Vec<ParkingSession>>, ApiError> {
    let limit = query.limit.min(100) as i64;
    let sessions = sqlx::query_as::<_, ParkingSession>(
        "SELECT * FROM parking_sessions WHERE status = 'active'
         ORDER BY entry_time DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(sessions))
}

/// First free space in id order, 404 when the lot is full
///
/// GET /api/parking/next-free-space
pub async fn next_free_space(
    State(state): State<Arc<AppState>>,
    _user: User,
) -> Result<Json<ParkingSpace>, ApiError> {
    let space = sqlx::query_as::<_, ParkingSpace>(
        "SELECT * FROM parking_spaces WHERE status = 'free' ORDER BY id LIMIT 1",
    )
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("No free spaces available"))?;
    Ok(Json(space))
}
