//! Parking-session models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A time-bounded occupancy of one space by one vehicle.
///
/// Active sessions have no exit data; completed sessions are immutable and
/// carry exit time, duration and cost. Timestamps are RFC 3339 strings.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ParkingSession {
    pub id: String,
    pub user_id: String,
    pub vehicle_id: Option<String>,
    pub plate: String,
    pub space_id: String,
    pub entry_time: String,
    pub exit_time: Option<String>,
    pub duration_minutes: Option<i64>,
    pub cost: Option<f64>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Session joined with the owning user, for admin listings.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SessionWithUser {
    pub id: String,
    pub user_id: String,
    pub plate: String,
    pub space_id: String,
    pub entry_time: String,
    pub exit_time: Option<String>,
    pub duration_minutes: Option<i64>,
    pub cost: Option<f64>,
    pub status: String,
    pub email: String,
    pub full_name: String,
}

// DTOs for API

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParkRequest {
    #[serde(default)]
    pub plate: String,
    #[serde(default)]
    pub space_id: String,
}

#[derive(Debug, Serialize)]
pub struct ParkResponse {
    pub message: String,
    pub session: ParkingSession,
}

/// Receipt returned when a vehicle checks out.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub message: String,
    pub plate: String,
    pub space_id: String,
    pub entry_time: String,
    pub exit_time: String,
    /// Formatted as "{h}h {m}min"
    pub duration: String,
    /// Formatted with two decimal places
    pub cost: String,
}
