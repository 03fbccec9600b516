use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::Actor;
use crate::errors::{AppError, AppResult};
use crate::models::user::{AuthResponse, DbUser, LoginRequest, RegisterRequest, Role, User};
use crate::utils::{hash_password, utc_now, verify_password};

#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = AuthResponse),
        (status = 400, description = "Password confirmation mismatch or invalid role"),
        (status = 409, description = "Username or email already in use")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    if payload.password != payload.password_confirm {
        return Err(AppError::bad_request("passwords do not match"));
    }

    let role = payload.role.unwrap_or(Role::Student);
    if role == Role::Admin {
        // admin accounts are seeded through the CLI, never self-registered
        return Err(AppError::bad_request("cannot self-register an admin account"));
    }

    ensure_identity_available(&state.pool, &payload.username, &payload.email).await?;

    let password_hash = hash_password(&payload.password)?;
    let now = utc_now();
    let user_id = Uuid::new_v4();

    sqlx::query(
        "INSERT INTO users (id, username, email, password_hash, role, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(&payload.username)
    .bind(&payload.email)
    .bind(password_hash)
    .bind(role.as_str())
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let db_user = fetch_user_by_id(&state.pool, user_id).await?;
    let user: User = db_user.try_into()?;
    let token = state.jwt.encode(user.id)?;

    crate::events::log_activity(&state.event_bus, "registered", Some(user.id), &user);

    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let db_user = sqlx::query_as::<_, DbUser>(
        "SELECT id, username, email, password_hash, role, created_at, updated_at FROM users WHERE username = ?",
    )
    .bind(&payload.username)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::unauthorized("invalid credentials"))?;

    let password_ok = verify_password(&payload.password, &db_user.password_hash)?;
    if !password_ok {
        return Err(AppError::unauthorized("invalid credentials"));
    }

    let token = state.jwt.encode(db_user.id)?;
    let user: User = db_user.try_into()?;

    Ok(Json(AuthResponse { token, user }))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "Auth",
    responses((status = 200, description = "Current user", body = User))
)]
pub async fn me(State(state): State<AppState>, actor: Actor) -> AppResult<Json<User>> {
    let db_user = fetch_user_by_id(&state.pool, actor.id).await?;
    let user: User = db_user.try_into()?;
    Ok(Json(user))
}

async fn ensure_identity_available(pool: &SqlitePool, username: &str, email: &str) -> AppResult<()> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE username = ? OR email = ?")
            .bind(username)
            .bind(email)
            .fetch_one(pool)
            .await?;

    if count > 0 {
        return Err(AppError::conflict("username or email already in use"));
    }

    Ok(())
}

async fn fetch_user_by_id(pool: &SqlitePool, user_id: Uuid) -> AppResult<DbUser> {
    sqlx::query_as::<_, DbUser>(
        "SELECT id, username, email, password_hash, role, created_at, updated_at FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("user not found"))
}
