//! Per-user vehicle catalog. Rows are created by the ledger on first park.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::db::{User, Vehicle};
use crate::parking::ledger::normalize_plate;
use crate::AppState;

use super::error::ApiError;

/// GET /api/vehicles
pub async fn list_vehicles(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Vec<Vehicle>>, ApiError> {
    let vehicles = sqlx::query_as::<_, Vehicle>(
        "SELECT * FROM vehicles WHERE user_id = ? ORDER BY created_at DESC",
    )
    .bind(&user.id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(vehicles))
}

/// GET /api/vehicles/:plate
pub async fn get_vehicle(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(plate): Path<String>,
) -> Result<Json<Vehicle>, ApiError> {
    let plate = normalize_plate(&plate);
    let vehicle =
        sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE user_id = ? AND plate = ?")
            .bind(&user.id)
            .bind(&plate)
            .fetch_optional(&state.db)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Vehicle {} not found", plate)))?;
    Ok(Json(vehicle))
}
