use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{visibility, Actor};
use crate::errors::{AppError, AppResult};
use crate::models::comment::{Comment, CommentCreateRequest, CommentListQuery, DbComment};
use crate::utils::utc_now;

const COMMENT_COLUMNS: &str =
    "c.id, c.project_id, c.user_id, c.comment_text, c.created_at, c.updated_at";

#[utoipa::path(
    get,
    path = "/comments",
    tag = "Comments",
    params(
        ("project_id" = Option<Uuid>, Query, description = "Filter by project"),
        ("user_id" = Option<Uuid>, Query, description = "Filter by author")
    ),
    responses((status = 200, description = "Comments visible to the caller", body = [Comment]))
)]
pub async fn list_comments(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<CommentListQuery>,
) -> AppResult<Json<Vec<Comment>>> {
    let scope = visibility::comments(&actor, "c");

    let mut sql = format!(
        "SELECT {COMMENT_COLUMNS} FROM comments c WHERE {}",
        scope.clause
    );
    if query.project_id.is_some() {
        sql.push_str(" AND c.project_id = ?");
    }
    if query.user_id.is_some() {
        sql.push_str(" AND c.user_id = ?");
    }
    sql.push_str(" ORDER BY c.created_at DESC");

    let mut q = sqlx::query_as::<_, DbComment>(&sql);
    for _ in 0..scope.actor_binds {
        q = q.bind(actor.id);
    }
    if let Some(project_id) = query.project_id {
        q = q.bind(project_id);
    }
    if let Some(user_id) = query.user_id {
        q = q.bind(user_id);
    }

    let rows = q.fetch_all(&state.pool).await?;
    let comments: Vec<Comment> = rows.into_iter().map(Comment::try_from).collect::<Result<_, _>>()?;

    Ok(Json(comments))
}

#[utoipa::path(
    get,
    path = "/comments/{id}",
    tag = "Comments",
    params(("id" = Uuid, Path, description = "Comment id")),
    responses((status = 200, description = "Comment detail", body = Comment))
)]
pub async fn get_comment(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Comment>> {
    let scope = visibility::comments(&actor, "c");
    let sql = format!(
        "SELECT {COMMENT_COLUMNS} FROM comments c WHERE c.id = ? AND {}",
        scope.clause
    );

    let mut query = sqlx::query_as::<_, DbComment>(&sql).bind(id);
    for _ in 0..scope.actor_binds {
        query = query.bind(actor.id);
    }

    let row = query
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::not_found("comment not found"))?;

    Ok(Json(row.try_into()?))
}

#[utoipa::path(
    post,
    path = "/comments",
    tag = "Comments",
    request_body = CommentCreateRequest,
    responses((status = 201, description = "Comment created", body = Comment))
)]
pub async fn create_comment(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<CommentCreateRequest>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    let now = utc_now();
    let comment_id = Uuid::new_v4();

    // the author is always the caller, never taken from the payload
    sqlx::query(
        "INSERT INTO comments (id, project_id, user_id, comment_text, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(comment_id)
    .bind(payload.project_id)
    .bind(actor.id)
    .bind(&payload.comment_text)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let comment: Comment = fetch_comment(&state.pool, comment_id).await?.try_into()?;

    crate::events::log_activity(&state.event_bus, "created", Some(actor.id), &comment);

    Ok((StatusCode::CREATED, Json(comment)))
}

async fn fetch_comment(pool: &SqlitePool, comment_id: Uuid) -> AppResult<DbComment> {
    let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments c WHERE c.id = ?");
    sqlx::query_as::<_, DbComment>(&sql)
        .bind(comment_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("comment not found"))
}
