//! Space registry read endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::db::ParkingSpace;
use crate::AppState;

use super::error::ApiError;

/// List all spaces
///
/// GET /api/spaces
pub async fn list_spaces(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ParkingSpace>>, ApiError> {
    let spaces = sqlx::query_as::<_, ParkingSpace>("SELECT * FROM parking_spaces ORDER BY id")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(spaces))
}

/// GET /api/spaces/free
pub async fn list_free_spaces(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ParkingSpace>>, ApiError> {
    let spaces = sqlx::query_as::<_, ParkingSpace>(
        "SELECT * FROM parking_spaces WHERE status = 'free' ORDER BY id",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(spaces))
}

/// GET /api/spaces/occupied
pub async fn list_occupied_spaces(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ParkingSpace>>, ApiError> {
    let spaces = sqlx::query_as::<_, ParkingSpace>(
        "SELECT * FROM parking_spaces WHERE status = 'occupied' ORDER BY id",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(spaces))
}

/// GET /api/spaces/:id
pub async fn get_space(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ParkingSpace>, ApiError> {
    let space = sqlx::query_as::<_, ParkingSpace>("SELECT * FROM parking_spaces WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Space {} not found", id)))?;
    Ok(Json(space))
}
