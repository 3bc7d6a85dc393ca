use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A single parking slot, identified by section letter + zero-padded number
/// (e.g. `A01`). Status is one of `free`, `occupied`, `reserved`; a space is
/// `occupied` exactly when one active session references it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ParkingSpace {
    pub id: String,
    pub section: String,
    pub number: i64,
    pub status: String,
    /// Plate of the vehicle currently occupying the space
    pub occupied_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}
