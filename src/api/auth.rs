//! Account and bearer-token management.
//!
//! Tokens are random 32-byte values handed to the client once and stored as
//! SHA-256 hashes with a 7-day expiry. The configured admin token is accepted
//! as a synthetic admin identity for scripting and bootstrap.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, Request},
    middleware::Next,
    response::Response,
    Json,
};
use rand::Rng;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::db::{
    DbPool, LoginRequest, LoginResponse, RegisterRequest, UpdateProfileRequest, User, UserResponse,
};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{validate_email, validate_password};

const TOKEN_TTL_DAYS: i64 = 7;

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Generate a random bearer token
fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

/// Hash a token for storage
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Stored in SQLite TEXT and compared against datetime('now')
fn token_expiry() -> String {
    (chrono::Utc::now() + chrono::Duration::days(TOKEN_TTL_DAYS))
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

async fn issue_token(db: &DbPool, user_id: &str) -> Result<String, ApiError> {
    let token = generate_token();
    sqlx::query(
        "INSERT INTO auth_tokens (id, user_id, token_hash, expires_at, created_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(hash_token(&token))
    .bind(token_expiry())
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(db)
    .await?;
    Ok(token)
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserResponse,
}

/// Register a new account with the `user` role
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(axum::http::StatusCode, Json<RegisterResponse>), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Err(e) = validate_email(&request.email) {
        errors.add("email", e);
    }
    if let Err(e) = validate_password(&request.password) {
        errors.add("password", e);
    }
    if request.full_name.trim().is_empty() {
        errors.add("full_name", "Full name is required");
    }
    errors.finish()?;

    let existing: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
        .bind(&request.email)
        .fetch_optional(&state.db)
        .await?;
    if existing.is_some() {
        return Err(ApiError::conflict("An account with this email already exists"));
    }

    let id = uuid::Uuid::new_v4().to_string();
    let password_hash =
        hash_password(&request.password).map_err(|_| ApiError::internal("Failed to hash password"))?;
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        "INSERT INTO users (id, email, password_hash, full_name, phone, role, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, 'user', ?, ?)",
    )
    .bind(&id)
    .bind(&request.email)
    .bind(&password_hash)
    .bind(&request.full_name)
    .bind(&request.phone)
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?;

    tracing::info!("Registered user {}", request.email);

    Ok((
        axum::http::StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Account created, you can now log in".to_string(),
            user: UserResponse {
                id,
                email: request.email,
                full_name: request.full_name,
                phone: request.phone,
                role: "user".to_string(),
            },
        }),
    ))
}

/// Login endpoint
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(&request.email)
        .fetch_optional(&state.db)
        .await?;

    let user = user.ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    if !verify_password(&request.password, &user.password_hash) {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let token = issue_token(&state.db, &user.id).await?;

    Ok(Json(LoginResponse {
        token,
        user: UserResponse::from(user),
    }))
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Revoke the presented token
pub async fn logout(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = extract_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;

    sqlx::query("DELETE FROM auth_tokens WHERE token_hash = ?")
        .bind(hash_token(&token))
        .execute(&state.db)
        .await?;

    Ok(Json(MessageResponse {
        message: "Logged out".to_string(),
    }))
}

/// Current user's profile
pub async fn get_profile(user: User) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let full_name = request.full_name.unwrap_or(user.full_name);
    if full_name.trim().is_empty() {
        return Err(ApiError::validation_field("full_name", "Full name is required"));
    }
    // An explicit `"phone": null` clears the stored number; an absent field
    // keeps it
    let phone = match request.phone {
        Some(phone) => phone,
        None => user.phone,
    };

    sqlx::query("UPDATE users SET full_name = ?, phone = ?, updated_at = ? WHERE id = ?")
        .bind(&full_name)
        .bind(&phone)
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(&user.id)
        .execute(&state.db)
        .await?;

    let user: User = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(&user.id)
        .fetch_one(&state.db)
        .await?;

    Ok(Json(UserResponse::from(user)))
}

/// Auth middleware that rejects requests without a valid token
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;

    get_current_user(&state.db, &state.config, &token).await?;

    Ok(next.run(request).await)
}

/// Extract the token from request headers
fn extract_token(headers: &axum::http::HeaderMap) -> Option<String> {
    let auth_header = headers.get("Authorization").and_then(|h| h.to_str().ok())?;
    auth_header
        .strip_prefix("Bearer ")
        .map(|token| token.to_string())
}

/// Resolve a token to its user. The configured admin token maps to a
/// synthetic admin identity.
pub async fn get_current_user(
    pool: &DbPool,
    config: &crate::config::Config,
    token: &str,
) -> Result<User, ApiError> {
    // Constant-time comparison against the configured admin token
    let admin_token = config.auth.admin_token.as_bytes();
    let provided = token.as_bytes();
    if admin_token.len() == provided.len() && admin_token.ct_eq(provided).into() {
        let now = chrono::Utc::now().to_rfc3339();
        return Ok(User {
            id: "system".to_string(),
            email: "system@parkr.local".to_string(),
            password_hash: String::new(),
            full_name: "System Admin".to_string(),
            phone: None,
            role: "admin".to_string(),
            created_at: now.clone(),
            updated_at: now,
        });
    }

    let token_hash = hash_token(token);
    let user: Option<User> = sqlx::query_as(
        "SELECT u.* FROM users u
         JOIN auth_tokens t ON t.user_id = u.id
         WHERE t.token_hash = ? AND t.expires_at > datetime('now')",
    )
    .bind(&token_hash)
    .fetch_optional(pool)
    .await?;

    user.ok_or_else(|| ApiError::unauthorized("Invalid or expired token"))
}

/// Single authorization gate for admin-only routes
pub fn require_admin(user: &User) -> Result<(), ApiError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden("Administrator access required"))
    }
}

/// Create the configured admin account on startup if it does not exist yet
pub async fn ensure_admin_user(pool: &DbPool, email: &str, password: &str) -> anyhow::Result<()> {
    let existing: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    if existing.is_some() {
        return Ok(());
    }

    let password_hash = hash_password(password)
        .map_err(|e| anyhow::anyhow!("Failed to hash admin password: {}", e))?;
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        "INSERT INTO users (id, email, password_hash, full_name, role, created_at, updated_at)
         VALUES (?, ?, ?, 'Administrator', 'admin', ?, ?)",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(email)
    .bind(&password_hash)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    tracing::info!("Created admin user {}", email);
    Ok(())
}

/// Extractor for getting the current authenticated user from a request
#[async_trait]
impl FromRequestParts<Arc<AppState>> for User {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;
        get_current_user(&state.db, &state.config, &token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_state_with_user(phone: Option<&str>) -> (Arc<AppState>, User) {
        // Single connection so every query sees the same in-memory database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::run_migrations(&pool).await.unwrap();

        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, full_name, phone, role, created_at, updated_at)
             VALUES ('u1', 'driver@example.com', '', 'Driver', ?, 'user', ?, ?)",
        )
        .bind(phone)
        .bind(&now)
        .bind(&now)
        .execute(&pool)
        .await
        .unwrap();

        let user: User = sqlx::query_as("SELECT * FROM users WHERE id = 'u1'")
            .fetch_one(&pool)
            .await
            .unwrap();
        let config: crate::config::Config = toml::from_str("").unwrap();
        (Arc::new(AppState::new(config, pool)), user)
    }

    #[tokio::test]
    async fn profile_update_keeps_phone_when_field_is_absent() {
        let (state, user) = test_state_with_user(Some("555-0101")).await;

        let request = UpdateProfileRequest {
            full_name: Some("New Name".to_string()),
            phone: None,
        };
        let Json(profile) = update_profile(State(state), user, Json(request))
            .await
            .unwrap();
        assert_eq!(profile.full_name, "New Name");
        assert_eq!(profile.phone.as_deref(), Some("555-0101"));
    }

    #[tokio::test]
    async fn profile_update_clears_phone_on_explicit_null() {
        let (state, user) = test_state_with_user(Some("555-0101")).await;

        // The deserialized shape of {"phone": null}
        let request = UpdateProfileRequest {
            full_name: None,
            phone: Some(None),
        };
        let Json(profile) = update_profile(State(state.clone()), user, Json(request))
            .await
            .unwrap();
        assert_eq!(profile.phone, None);

        let stored: (Option<String>,) =
            sqlx::query_as("SELECT phone FROM users WHERE id = 'u1'")
                .fetch_one(&state.db)
                .await
                .unwrap();
        assert_eq!(stored.0, None);
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("parking42").unwrap();
        assert!(verify_password("parking42", &hash));
        assert!(!verify_password("parking43", &hash));
        assert!(!verify_password("parking42", "not-a-hash"));
    }

    #[test]
    fn tokens_are_unique_and_hashed() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(hash_token(&a), a);
        assert_eq!(hash_token(&a), hash_token(&a));
    }

    #[test]
    fn admin_gate() {
        let now = chrono::Utc::now().to_rfc3339();
        let mut user = User {
            id: "u1".to_string(),
            email: "driver@example.com".to_string(),
            password_hash: String::new(),
            full_name: "Driver".to_string(),
            phone: None,
            role: "user".to_string(),
            created_at: now.clone(),
            updated_at: now,
        };
        assert!(require_admin(&user).is_err());
        user.role = "admin".to_string();
        assert!(require_admin(&user).is_ok());
    }
}
