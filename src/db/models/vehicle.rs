use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A user-owned vehicle. Plates are uppercase-normalized and unique per user;
/// the row is created the first time the plate is parked.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Vehicle {
    pub id: String,
    pub user_id: String,
    pub plate: String,
    pub created_at: String,
}
