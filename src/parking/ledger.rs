//! Session ledger: the single write path for parking state.
//!
//! Every park/unpark runs in one SQLite transaction so the space-status flip
//! and the session write land (or fail) together. The check-then-act race on
//! concurrent park requests is closed by the partial unique indexes on active
//! sessions (one per plate, one per space): the losing writer gets a UNIQUE
//! violation and its transaction rolls back with no state change.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::db::ParkingSession;
use crate::parking::pricing;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Space {0} not found")]
    SpaceNotFound(String),
    #[error("Space {0} is not available")]
    SpaceUnavailable(String),
    #[error("Vehicle {0} is already parked")]
    AlreadyParked(String),
    #[error("Vehicle {0} is not in the parking lot")]
    NotParked(String),
    #[error("Stored timestamp is not valid RFC 3339: {0}")]
    BadTimestamp(String),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

pub fn normalize_plate(plate: &str) -> String {
    plate.trim().to_uppercase()
}

/// Start a session: flip the target space to `occupied` and create an active
/// session for the plate, atomically.
pub async fn park(
    pool: &SqlitePool,
    user_id: &str,
    plate: &str,
    space_id: &str,
) -> Result<ParkingSession, LedgerError> {
    let plate = normalize_plate(plate);
    let now = Utc::now().to_rfc3339();

    let mut tx = pool.begin().await?;

    // Guarded update: only a free space flips. Zero rows means the space is
    // missing or taken; look it up to tell the two apart.
    let flipped = sqlx::query(
        "UPDATE parking_spaces SET status = 'occupied', occupied_by = ?, updated_at = ?
         WHERE id = ? AND status = 'free'",
    )
    .bind(&plate)
    .bind(&now)
    .bind(space_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if flipped == 0 {
        let existing: Option<(String,)> =
            sqlx::query_as("SELECT status FROM parking_spaces WHERE id = ?")
                .bind(space_id)
                .fetch_optional(&mut *tx)
                .await?;
        return Err(match existing {
            None => LedgerError::SpaceNotFound(space_id.to_string()),
            Some(_) => LedgerError::SpaceUnavailable(space_id.to_string()),
        });
    }

    // First park of this plate creates the user's vehicle record
    sqlx::query(
        "INSERT OR IGNORE INTO vehicles (id, user_id, plate, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(&plate)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    let vehicle_id: (String,) =
        sqlx::query_as("SELECT id FROM vehicles WHERE user_id = ? AND plate = ?")
            .bind(user_id)
            .bind(&plate)
            .fetch_one(&mut *tx)
            .await?;

    let session_id = Uuid::new_v4().to_string();
    let inserted = sqlx::query(
        "INSERT INTO parking_sessions
         (id, user_id, vehicle_id, plate, space_id, entry_time, status, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, 'active', ?, ?)",
    )
    .bind(&session_id)
    .bind(user_id)
    .bind(&vehicle_id.0)
    .bind(&plate)
    .bind(space_id)
    .bind(&now)
    .bind(&now)
    .bind(&now)
    .execute(&mut *tx)
    .await;

    if let Err(err) = inserted {
        // Dropping the transaction rolls back the space flip
        return Err(map_unique_violation(err, &plate, space_id));
    }

    tx.commit().await?;

    info!(plate = %plate, space_id = %space_id, user_id = %user_id, "Vehicle parked");

    let session = sqlx::query_as("SELECT * FROM parking_sessions WHERE id = ?")
        .bind(&session_id)
        .fetch_one(pool)
        .await?;
    Ok(session)
}

/// Complete the caller's active session for a plate: record exit time,
/// duration and cost, and free the space, atomically. Completed sessions are
/// never touched again.
pub async fn unpark(
    pool: &SqlitePool,
    user_id: &str,
    plate: &str,
    hourly_rate: f64,
) -> Result<ParkingSession, LedgerError> {
    let plate = normalize_plate(plate);
    let exit = Utc::now();
    let exit_time = exit.to_rfc3339();

    let mut tx = pool.begin().await?;

    // Claim the active session with a write before any read. SQLite grabs the
    // write lock on the first statement, so a concurrent unpark of the same
    // session sees zero rows here instead of failing a deferred transaction's
    // read-to-write upgrade mid-way.
    let claimed = sqlx::query(
        "UPDATE parking_sessions SET updated_at = ?
         WHERE user_id = ? AND plate = ? AND status = 'active'",
    )
    .bind(&exit_time)
    .bind(user_id)
    .bind(&plate)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if claimed == 0 {
        return Err(LedgerError::NotParked(plate));
    }

    let session: ParkingSession = sqlx::query_as(
        "SELECT * FROM parking_sessions WHERE user_id = ? AND plate = ? AND status = 'active'",
    )
    .bind(user_id)
    .bind(&plate)
    .fetch_one(&mut *tx)
    .await?;

    let entry = parse_timestamp(&session.entry_time)?;
    let duration_minutes = pricing::elapsed_minutes(entry, exit);
    let cost = pricing::billable_cost(duration_minutes, hourly_rate);

    sqlx::query(
        "UPDATE parking_sessions
         SET exit_time = ?, duration_minutes = ?, cost = ?, status = 'completed', updated_at = ?
         WHERE id = ?",
    )
    .bind(&exit_time)
    .bind(duration_minutes)
    .bind(cost)
    .bind(&exit_time)
    .bind(&session.id)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE parking_spaces SET status = 'free', occupied_by = NULL, updated_at = ?
         WHERE id = ?",
    )
    .bind(&exit_time)
    .bind(&session.space_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(
        plate = %plate,
        space_id = %session.space_id,
        duration_minutes,
        cost,
        "Vehicle unparked"
    );

    let session = sqlx::query_as("SELECT * FROM parking_sessions WHERE id = ?")
        .bind(&session.id)
        .fetch_one(pool)
        .await?;
    Ok(session)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, LedgerError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| LedgerError::BadTimestamp(value.to_string()))
}

fn map_unique_violation(err: sqlx::Error, plate: &str, space_id: &str) -> LedgerError {
    if let sqlx::Error::Database(ref db_err) = err {
        let msg = db_err.message();
        if msg.contains("idx_sessions_active_plate") {
            return LedgerError::AlreadyParked(plate.to_string());
        }
        if msg.contains("idx_sessions_active_space") {
            return LedgerError::SpaceUnavailable(space_id.to_string());
        }
    }
    LedgerError::Db(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        // Single connection so every query sees the same in-memory database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::run_migrations(&pool).await.unwrap();
        crate::db::seeders::seed_spaces(&pool, 20, 10).await.unwrap();
        pool
    }

    async fn space_status(pool: &SqlitePool, id: &str) -> (String, Option<String>) {
        sqlx::query_as("SELECT status, occupied_by FROM parking_spaces WHERE id = ?")
            .bind(id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn park_creates_active_session_and_occupies_space() {
        let pool = test_pool().await;

        let session = park(&pool, "u1", "abc1d23", "A01").await.unwrap();
        assert_eq!(session.plate, "ABC1D23");
        assert_eq!(session.space_id, "A01");
        assert_eq!(session.status, "active");
        assert!(session.exit_time.is_none());

        let (status, occupied_by) = space_status(&pool, "A01").await;
        assert_eq!(status, "occupied");
        assert_eq!(occupied_by.as_deref(), Some("ABC1D23"));
    }

    #[tokio::test]
    async fn park_unknown_space_is_not_found() {
        let pool = test_pool().await;
        let err = park(&pool, "u1", "ABC1D23", "Z99").await.unwrap_err();
        assert!(matches!(err, LedgerError::SpaceNotFound(_)));
    }

    #[tokio::test]
    async fn park_occupied_space_is_a_conflict() {
        let pool = test_pool().await;
        park(&pool, "u1", "AAA0A00", "A01").await.unwrap();

        let err = park(&pool, "u2", "BBB0B00", "A01").await.unwrap_err();
        assert!(matches!(err, LedgerError::SpaceUnavailable(_)));

        // First occupant is untouched
        let (status, occupied_by) = space_status(&pool, "A01").await;
        assert_eq!(status, "occupied");
        assert_eq!(occupied_by.as_deref(), Some("AAA0A00"));
    }

    #[tokio::test]
    async fn double_park_rolls_back_the_space_flip() {
        let pool = test_pool().await;
        park(&pool, "u1", "ABC1D23", "A01").await.unwrap();

        // Same plate into a second space: the session insert violates the
        // active-plate index and the A02 flip must not survive
        let err = park(&pool, "u1", "abc1d23", "A02").await.unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyParked(_)));

        let (status, occupied_by) = space_status(&pool, "A02").await;
        assert_eq!(status, "free");
        assert_eq!(occupied_by, None);

        let active: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM parking_sessions WHERE plate = 'ABC1D23' AND status = 'active'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(active.0, 1);
    }

    #[tokio::test]
    async fn unpark_without_session_is_not_found_and_changes_nothing() {
        let pool = test_pool().await;
        let err = unpark(&pool, "u1", "GHO5T00", 5.0).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotParked(_)));

        let occupied: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM parking_spaces WHERE status = 'occupied'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(occupied.0, 0);
    }

    #[tokio::test]
    async fn unpark_is_scoped_to_the_owning_user() {
        let pool = test_pool().await;
        park(&pool, "u1", "ABC1D23", "A01").await.unwrap();

        let err = unpark(&pool, "u2", "ABC1D23", 5.0).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotParked(_)));
    }

    #[tokio::test]
    async fn ninety_minute_stay_bills_two_hours() {
        let pool = test_pool().await;
        let session = park(&pool, "u1", "ABC1D23", "A01").await.unwrap();

        // Backdate the entry to simulate a 90 minute stay
        let entry = (Utc::now() - Duration::minutes(90)).to_rfc3339();
        sqlx::query("UPDATE parking_sessions SET entry_time = ? WHERE id = ?")
            .bind(&entry)
            .bind(&session.id)
            .execute(&pool)
            .await
            .unwrap();

        let completed = unpark(&pool, "u1", "ABC1D23", 5.0).await.unwrap();
        assert_eq!(completed.status, "completed");
        assert_eq!(completed.duration_minutes, Some(90));
        assert_eq!(completed.cost, Some(10.0));
        assert!(completed.exit_time.unwrap() > completed.entry_time);

        let (status, occupied_by) = space_status(&pool, "A01").await;
        assert_eq!(status, "free");
        assert_eq!(occupied_by, None);
    }

    #[tokio::test]
    async fn near_zero_stay_charges_minimum_hour() {
        let pool = test_pool().await;
        park(&pool, "u1", "ABC1D23", "B03").await.unwrap();

        let completed = unpark(&pool, "u1", "abc1d23", 5.0).await.unwrap();
        assert_eq!(completed.duration_minutes, Some(0));
        assert_eq!(completed.cost, Some(5.0));
    }

    #[tokio::test]
    async fn completed_sessions_are_immutable() {
        let pool = test_pool().await;
        park(&pool, "u1", "ABC1D23", "A01").await.unwrap();
        let first = unpark(&pool, "u1", "ABC1D23", 5.0).await.unwrap();

        // A second unpark finds no active session and leaves the record alone
        let err = unpark(&pool, "u1", "ABC1D23", 5.0).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotParked(_)));

        let stored: ParkingSession =
            sqlx::query_as("SELECT * FROM parking_sessions WHERE id = ?")
                .bind(&first.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(stored.exit_time, first.exit_time);
        assert_eq!(stored.cost, first.cost);
    }

    #[tokio::test]
    async fn concurrent_unpark_has_exactly_one_winner() {
        // A shared on-disk database lets two pooled connections actually
        // interleave, unlike the single-connection in-memory setup
        let path = std::env::temp_dir().join(format!("parkr-test-{}.db", Uuid::new_v4()));
        let url = format!("sqlite://{}?mode=rwc", path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .unwrap();
        crate::db::run_migrations(&pool).await.unwrap();
        crate::db::seeders::seed_spaces(&pool, 20, 10).await.unwrap();

        park(&pool, "u1", "ABC1D23", "A01").await.unwrap();

        let (a, b) = tokio::join!(
            unpark(&pool, "u1", "ABC1D23", 5.0),
            unpark(&pool, "u1", "ABC1D23", 5.0),
        );

        // One caller completes the session, the other gets a clean not-found
        let (winner, loser) = if a.is_ok() { (a, b) } else { (b, a) };
        assert_eq!(winner.unwrap().status, "completed");
        assert!(matches!(loser.unwrap_err(), LedgerError::NotParked(_)));

        let active: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM parking_sessions WHERE status = 'active'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(active.0, 0);

        let (status, occupied_by) = space_status(&pool, "A01").await;
        assert_eq!(status, "free");
        assert_eq!(occupied_by, None);

        pool.close().await;
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn plate_can_park_again_after_unpark() {
        let pool = test_pool().await;
        park(&pool, "u1", "ABC1D23", "A01").await.unwrap();
        unpark(&pool, "u1", "ABC1D23", 5.0).await.unwrap();

        let session = park(&pool, "u1", "ABC1D23", "A02").await.unwrap();
        assert_eq!(session.space_id, "A02");

        // One vehicle record per (user, plate) across repeat visits
        let vehicles: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM vehicles WHERE user_id = 'u1'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(vehicles.0, 1);
    }

    #[tokio::test]
    async fn occupied_iff_exactly_one_active_session() {
        let pool = test_pool().await;
        park(&pool, "u1", "AAA1A11", "A01").await.unwrap();
        park(&pool, "u2", "BBB2B22", "A02").await.unwrap();
        park(&pool, "u3", "CCC3C33", "B01").await.unwrap();
        unpark(&pool, "u2", "BBB2B22", 5.0).await.unwrap();

        let mismatched: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM parking_spaces s
             WHERE (s.status = 'occupied') !=
                   ((SELECT COUNT(*) FROM parking_sessions p
                     WHERE p.space_id = s.id AND p.status = 'active') = 1)",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(mismatched.0, 0);

        let occupied: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM parking_spaces WHERE status = 'occupied'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(occupied.0, 2);
    }
}
