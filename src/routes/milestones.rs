use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::policy::{self, AccessStore};
use crate::authz::{visibility, Actor};
use crate::errors::{AppError, AppResult};
use crate::models::milestone::{
    derive_status, validate_completion, CompletionUpdateRequest, DbMilestone, Milestone,
    MilestoneCreateRequest, MilestoneListQuery, MilestoneStatus, MilestoneUpdateRequest,
};
use crate::utils::utc_now;

const MILESTONE_COLUMNS: &str =
    "m.id, m.project_id, m.title, m.description, m.completion, m.deadline, m.status, \
     m.created_at, m.updated_at";

#[utoipa::path(
    get,
    path = "/milestones",
    tag = "Milestones",
    params(
        ("project_id" = Option<Uuid>, Query, description = "Filter by project"),
        ("status" = Option<String>, Query, description = "Filter by status")
    ),
    responses((status = 200, description = "Milestones visible to the caller", body = [Milestone]))
)]
pub async fn list_milestones(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<MilestoneListQuery>,
) -> AppResult<Json<Vec<Milestone>>> {
    let scope = visibility::milestones(&actor, "m");

    let mut sql = format!(
        "SELECT {MILESTONE_COLUMNS} FROM milestones m WHERE {}",
        scope.clause
    );
    if query.project_id.is_some() {
        sql.push_str(" AND m.project_id = ?");
    }
    if query.status.is_some() {
        sql.push_str(" AND m.status = ?");
    }
    sql.push_str(" ORDER BY m.deadline ASC");

    let mut q = sqlx::query_as::<_, DbMilestone>(&sql);
    for _ in 0..scope.actor_binds {
        q = q.bind(actor.id);
    }
    if let Some(project_id) = query.project_id {
        q = q.bind(project_id);
    }
    if let Some(status) = query.status {
        q = q.bind(status.as_str());
    }

    let rows = q.fetch_all(&state.pool).await?;
    let milestones: Vec<Milestone> =
        rows.into_iter().map(Milestone::try_from).collect::<Result<_, _>>()?;

    Ok(Json(milestones))
}

#[utoipa::path(
    get,
    path = "/milestones/{id}",
    tag = "Milestones",
    params(("id" = Uuid, Path, description = "Milestone id")),
    responses((status = 200, description = "Milestone detail", body = Milestone))
)]
pub async fn get_milestone(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Milestone>> {
    let milestone = fetch_milestone_scoped(&state.pool, &actor, id).await?;
    Ok(Json(milestone.try_into()?))
}

#[utoipa::path(
    post,
    path = "/milestones",
    tag = "Milestones",
    request_body = MilestoneCreateRequest,
    responses((status = 201, description = "Milestone created", body = Milestone))
)]
pub async fn create_milestone(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<MilestoneCreateRequest>,
) -> AppResult<(StatusCode, Json<Milestone>)> {
    policy::ensure_supervision_write(&actor, payload.project_id, &state.pool).await?;

    if let Some(completion) = payload.completion {
        validate_completion(completion)?;
    }

    // a completion value drives the stored status; otherwise the client's
    // status (or not_started) is taken as-is
    let mut status = payload.status.unwrap_or(MilestoneStatus::NotStarted);
    if let Some(completion) = payload.completion {
        status = derive_status(completion, status);
    }

    let now = utc_now();
    let milestone_id = Uuid::new_v4();

    sqlx::query(
        "INSERT INTO milestones (id, project_id, title, description, completion, deadline, status, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(milestone_id)
    .bind(payload.project_id)
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(payload.completion)
    .bind(payload.deadline)
    .bind(status.as_str())
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let milestone: Milestone = fetch_milestone(&state.pool, milestone_id).await?.try_into()?;

    crate::events::log_activity(&state.event_bus, "created", Some(actor.id), &milestone);

    Ok((StatusCode::CREATED, Json(milestone)))
}

#[utoipa::path(
    put,
    path = "/milestones/{id}",
    tag = "Milestones",
    params(("id" = Uuid, Path, description = "Milestone id")),
    request_body = MilestoneUpdateRequest,
    responses((status = 200, description = "Milestone updated", body = Milestone))
)]
pub async fn update_milestone(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<MilestoneUpdateRequest>,
) -> AppResult<Json<Milestone>> {
    let mut milestone = fetch_milestone_scoped(&state.pool, &actor, id).await?;
    policy::ensure_supervision_write(&actor, milestone.project_id, &state.pool).await?;

    if let Some(title) = payload.title {
        milestone.title = title;
    }
    if let Some(description) = payload.description {
        milestone.description = description;
    }
    if let Some(deadline) = payload.deadline {
        milestone.deadline = deadline;
    }
    if let Some(status) = payload.status {
        milestone.status = status.as_str().to_string();
    }
    if let Some(completion) = payload.completion {
        validate_completion(completion)?;
        milestone.completion = Some(completion);
        let current = MilestoneStatus::parse(&milestone.status)?;
        milestone.status = derive_status(completion, current).as_str().to_string();
    }

    let now = utc_now();
    sqlx::query(
        "UPDATE milestones SET title = ?, description = ?, completion = ?, deadline = ?, status = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&milestone.title)
    .bind(&milestone.description)
    .bind(milestone.completion)
    .bind(milestone.deadline)
    .bind(&milestone.status)
    .bind(now)
    .bind(milestone.id)
    .execute(&state.pool)
    .await?;

    milestone.updated_at = now;
    let milestone: Milestone = milestone.try_into()?;

    crate::events::log_activity(&state.event_bus, "updated", Some(actor.id), &milestone);

    Ok(Json(milestone))
}

#[utoipa::path(
    delete,
    path = "/milestones/{id}",
    tag = "Milestones",
    params(("id" = Uuid, Path, description = "Milestone id")),
    responses((status = 204, description = "Milestone deleted"))
)]
pub async fn delete_milestone(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let milestone = fetch_milestone_scoped(&state.pool, &actor, id).await?;
    policy::ensure_supervision_write(&actor, milestone.project_id, &state.pool).await?;

    sqlx::query("DELETE FROM milestones WHERE id = ?")
        .bind(milestone.id)
        .execute(&state.pool)
        .await?;

    let milestone: Milestone = milestone.try_into()?;
    crate::events::log_activity(&state.event_bus, "deleted", Some(actor.id), &milestone);

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/milestones/{id}/update_completion",
    tag = "Milestones",
    params(("id" = Uuid, Path, description = "Milestone id")),
    request_body = CompletionUpdateRequest,
    responses(
        (status = 200, description = "Completion updated", body = Milestone),
        (status = 400, description = "Completion out of range or not an integer"),
        (status = 403, description = "Not allowed to update this milestone")
    )
)]
pub async fn update_completion(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<CompletionUpdateRequest>,
) -> AppResult<Json<Milestone>> {
    let mut milestone = fetch_milestone_scoped(&state.pool, &actor, id).await?;

    let owner = state
        .pool
        .project_owner(milestone.project_id)
        .await?
        .flatten();
    policy::ensure_can_update_completion(&actor, milestone.project_id, owner, &state.pool).await?;

    let completion = payload.parse_completion()?;
    let current = MilestoneStatus::parse(&milestone.status)?;
    let status = derive_status(completion, current);

    let now = utc_now();
    sqlx::query("UPDATE milestones SET completion = ?, status = ?, updated_at = ? WHERE id = ?")
        .bind(completion)
        .bind(status.as_str())
        .bind(now)
        .bind(milestone.id)
        .execute(&state.pool)
        .await?;

    milestone.completion = Some(completion);
    milestone.status = status.as_str().to_string();
    milestone.updated_at = now;
    let milestone: Milestone = milestone.try_into()?;

    crate::events::log_activity(&state.event_bus, "completion_updated", Some(actor.id), &milestone);

    Ok(Json(milestone))
}

async fn fetch_milestone_scoped(pool: &SqlitePool, actor: &Actor, milestone_id: Uuid) -> AppResult<DbMilestone> {
    let scope = visibility::milestones(actor, "m");
    let sql = format!(
        "SELECT {MILESTONE_COLUMNS} FROM milestones m WHERE m.id = ? AND {}",
        scope.clause
    );

    let mut query = sqlx::query_as::<_, DbMilestone>(&sql).bind(milestone_id);
    for _ in 0..scope.actor_binds {
        query = query.bind(actor.id);
    }

    query
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("milestone not found"))
}

async fn fetch_milestone(pool: &SqlitePool, milestone_id: Uuid) -> AppResult<DbMilestone> {
    let sql = format!("SELECT {MILESTONE_COLUMNS} FROM milestones m WHERE m.id = ?");
    sqlx::query_as::<_, DbMilestone>(&sql)
        .bind(milestone_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("milestone not found"))
}
