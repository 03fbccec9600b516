use axum::extract::{Path, Query, State};
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::Actor;
use crate::errors::{AppError, AppResult};
use crate::models::user::{DbUser, User, UserListQuery};

#[utoipa::path(
    get,
    path = "/users",
    tag = "Users",
    params(
        ("role" = Option<String>, Query, description = "Exact role filter"),
        ("search" = Option<String>, Query, description = "Substring match on username or email")
    ),
    responses((status = 200, description = "List users", body = [User]))
)]
pub async fn list_users(
    State(state): State<AppState>,
    _actor: Actor,
    Query(query): Query<UserListQuery>,
) -> AppResult<Json<Vec<User>>> {
    let mut sql = String::from(
        "SELECT id, username, email, password_hash, role, created_at, updated_at FROM users WHERE 1 = 1",
    );
    if query.role.is_some() {
        sql.push_str(" AND role = ?");
    }
    if query.search.is_some() {
        sql.push_str(" AND (username LIKE ? OR email LIKE ?)");
    }
    sql.push_str(" ORDER BY username ASC");

    let mut q = sqlx::query_as::<_, DbUser>(&sql);
    if let Some(role) = query.role {
        q = q.bind(role.as_str());
    }
    if let Some(search) = &query.search {
        let pattern = format!("%{}%", search);
        q = q.bind(pattern.clone());
        q = q.bind(pattern);
    }

    let rows = q.fetch_all(&state.pool).await?;
    let users: Vec<User> = rows.into_iter().map(User::try_from).collect::<Result<_, _>>()?;

    Ok(Json(users))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    responses((status = 200, description = "User detail", body = User))
)]
pub async fn get_user(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
) -> AppResult<Json<User>> {
    let row = sqlx::query_as::<_, DbUser>(
        "SELECT id, username, email, password_hash, role, created_at, updated_at FROM users WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::not_found("user not found"))?;

    Ok(Json(row.try_into()?))
}
