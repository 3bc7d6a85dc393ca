//! Parking-session endpoints: check-in, check-out, and listings.
//!
//! Handlers validate input and delegate all state transitions to the session
//! ledger, which owns atomicity and the per-plate/per-space invariants.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::db::{ParkRequest, ParkResponse, ParkingSession, Receipt, SessionWithUser, User};
use crate::parking::{ledger, pricing};
use crate::AppState;

use super::auth::require_admin;
use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{validate_plate, validate_space_id};

/// Check a vehicle in
///
/// POST /api/sessions/park
pub async fn park(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(request): Json<ParkRequest>,
) -> Result<(StatusCode, Json<ParkResponse>), ApiError> {
    let plate = ledger::normalize_plate(&request.plate);

    let mut errors = ValidationErrorBuilder::new();
    if let Err(e) = validate_plate(&plate) {
        errors.add("plate", e);
    }
    if let Err(e) = validate_space_id(&request.space_id) {
        errors.add("spaceId", e);
    }
    errors.finish()?;

    let session = ledger::park(&state.db, &user.id, &plate, &request.space_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(ParkResponse {
            message: "Vehicle parked".to_string(),
            session,
        }),
    ))
}

/// Check a vehicle out and return the receipt
///
/// POST /api/sessions/unpark/:plate
pub async fn unpark(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(plate): Path<String>,
) -> Result<Json<Receipt>, ApiError> {
    let session =
        ledger::unpark(&state.db, &user.id, &plate, state.config.parking.hourly_rate).await?;

    // Completed sessions always carry exit data
    let duration_minutes = session.duration_minutes.unwrap_or(0);
    let cost = session.cost.unwrap_or(0.0);

    Ok(Json(Receipt {
        message: "Checkout complete".to_string(),
        plate: session.plate,
        space_id: session.space_id,
        entry_time: session.entry_time,
        exit_time: session.exit_time.unwrap_or_default(),
        duration: pricing::format_duration(duration_minutes),
        cost: pricing::format_cost(cost),
    }))
}

/// Caller's active sessions
///
/// GET /api/sessions/my-sessions
pub async fn my_sessions(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Vec<ParkingSession>>, ApiError> {
    let sessions = sqlx::query_as::<_, ParkingSession>(
        "SELECT * FROM parking_sessions
         WHERE user_id = ? AND status = 'active'
         ORDER BY entry_time DESC",
    )
    .bind(&user.id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(sessions))
}

/// Caller's completed sessions, most recent first
///
/// GET /api/sessions/my-history
pub async fn my_history(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Vec<ParkingSession>>, ApiError> {
    let sessions = sqlx::query_as::<_, ParkingSession>(
        "SELECT * FROM parking_sessions
         WHERE user_id = ? AND status = 'completed'
         ORDER BY exit_time DESC
         LIMIT 20",
    )
    .bind(&user.id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(sessions))
}

/// All active sessions with owner details (admin)
///
/// GET /api/sessions/all-sessions
pub async fn all_sessions(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Vec<SessionWithUser>>, ApiError> {
    require_admin(&user)?;

    let sessions = sqlx::query_as::<_, SessionWithUser>(
        "SELECT s.id, s.user_id, s.plate, s.space_id, s.entry_time, s.exit_time,
                s.duration_minutes, s.cost, s.status, u.email, u.full_name
         FROM parking_sessions s
         JOIN users u ON u.id = s.user_id
         WHERE s.status = 'active'
         ORDER BY s.entry_time DESC",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(sessions))
}

/// Full completed history with owner details (admin)
///
/// GET /api/sessions/all-history
pub async fn all_history(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Vec<SessionWithUser>>, ApiError> {
    require_admin(&user)?;

    let sessions = sqlx::query_as::<_, SessionWithUser>(
        "SELECT s.id, s.user_id, s.plate, s.space_id, s.entry_time, s.exit_time,
                s.duration_minutes, s.cost, s.status, u.email, u.full_name
         FROM parking_sessions s
         JOIN users u ON u.id = s.user_id
         WHERE s.status = 'completed'
         ORDER BY s.exit_time DESC
         LIMIT 100",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(sessions))
}
