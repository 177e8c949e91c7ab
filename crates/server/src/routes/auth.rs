use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::{
    db::timestamp_now,
    error::{is_unique_violation, AppError, Result},
    ids::{new_id, non_blank},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub auth_token: String,
    pub user_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub email: String,
    pub username: String,
    pub exp: usize,
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|_| AppError::Internal("Failed to hash password".to_string()))
}

fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn create_token(
    user_id: &str,
    email: &str,
    username: &str,
    secret: &str,
    ttl_hours: i64,
) -> Result<String> {
    let expiration = chrono::Duration::try_hours(ttl_hours)
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        .ok_or_else(|| AppError::Internal("Session expiry out of range".to_string()))?
        .timestamp() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        username: username.to_string(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AppError::Internal("Failed to create token".to_string()))
}

async fn register(
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<RegisterRequest>, AppError>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    let (Some(username), Some(email), Some(password)) = (
        non_blank(body.username.as_deref()),
        non_blank(body.email.as_deref()),
        body.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::MissingFields);
    };

    let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = ?")
        .bind(email)
        .fetch_one(&state.db.pool)
        .await?;

    if existing > 0 {
        return Err(AppError::EmailExists);
    }

    let password_hash = hash_password(password)?;
    let user_id = new_id();

    sqlx::query(
        "INSERT INTO users (id, username, email, password_hash, bio, avatar_url, created_at) VALUES (?, ?, ?, ?, '', '', ?)",
    )
    .bind(&user_id)
    .bind(username)
    .bind(email)
    .bind(&password_hash)
    .bind(timestamp_now())
    .execute(&state.db.pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::EmailExists
        } else {
            AppError::Database(e)
        }
    })?;

    tracing::info!(user_id = %user_id, "registered user");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered",
            user_id,
        }),
    ))
}

async fn login(
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<LoginRequest>, AppError>,
) -> Result<Json<LoginResponse>> {
    let (Some(email), Some(password)) = (
        non_blank(body.email.as_deref()),
        body.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::MissingFields);
    };

    let user = sqlx::query_as::<_, (String, String, String, String)>(
        "SELECT id, email, username, password_hash FROM users WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(&state.db.pool)
    .await?
    .ok_or(AppError::InvalidCredentials)?;

    let (user_id, email, username, password_hash) = user;

    if !verify_password(password, &password_hash)? {
        return Err(AppError::InvalidCredentials);
    }

    let token = create_token(
        &user_id,
        &email,
        &username,
        &state.config.jwt_secret,
        state.config.session_ttl_hours,
    )?;

    if let Err(e) = state
        .audit
        .record_login(&user_id, &username, &email, &token)
        .await
    {
        tracing::warn!(user_id = %user_id, error = %e, "failed to record login history");
    }

    tracing::info!(user_id = %user_id, "user logged in");

    Ok(Json(LoginResponse {
        message: "Login successful",
        auth_token: token,
        user_id,
    }))
}
