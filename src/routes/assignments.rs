use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{policy, visibility, Actor};
use crate::errors::{AppError, AppResult};
use crate::models::assignment::{
    AssignmentCreateRequest, AssignmentListQuery, AssignmentUpdateRequest, DbTeacherAssignment,
    TeacherAssignment,
};
use crate::utils::utc_now;

const ASSIGNMENT_COLUMNS: &str =
    "a.id, a.project_id, a.teacher_id, a.role, a.accepted, a.assigned_at, a.updated_at";

#[utoipa::path(
    get,
    path = "/assignments",
    tag = "Assignments",
    params(
        ("project_id" = Option<Uuid>, Query, description = "Filter by project"),
        ("teacher_id" = Option<Uuid>, Query, description = "Filter by teacher"),
        ("role" = Option<String>, Query, description = "Filter by teacher role"),
        ("accepted" = Option<bool>, Query, description = "Filter by acceptance state")
    ),
    responses((status = 200, description = "Assignments visible to the caller", body = [TeacherAssignment]))
)]
pub async fn list_assignments(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<AssignmentListQuery>,
) -> AppResult<Json<Vec<TeacherAssignment>>> {
    let scope = visibility::assignments(&actor, "a");

    let mut sql = format!(
        "SELECT {ASSIGNMENT_COLUMNS} FROM project_teachers a WHERE {}",
        scope.clause
    );
    if query.project_id.is_some() {
        sql.push_str(" AND a.project_id = ?");
    }
    if query.teacher_id.is_some() {
        sql.push_str(" AND a.teacher_id = ?");
    }
    if query.role.is_some() {
        sql.push_str(" AND a.role = ?");
    }
    if query.accepted.is_some() {
        sql.push_str(" AND a.accepted = ?");
    }
    sql.push_str(" ORDER BY a.assigned_at DESC");

    let mut q = sqlx::query_as::<_, DbTeacherAssignment>(&sql);
    for _ in 0..scope.actor_binds {
        q = q.bind(actor.id);
    }
    if let Some(project_id) = query.project_id {
        q = q.bind(project_id);
    }
    if let Some(teacher_id) = query.teacher_id {
        q = q.bind(teacher_id);
    }
    if let Some(role) = query.role {
        q = q.bind(role.as_str());
    }
    if let Some(accepted) = query.accepted {
        q = q.bind(accepted);
    }

    let rows = q.fetch_all(&state.pool).await?;
    let assignments: Vec<TeacherAssignment> =
        rows.into_iter().map(TeacherAssignment::try_from).collect::<Result<_, _>>()?;

    Ok(Json(assignments))
}

#[utoipa::path(
    get,
    path = "/assignments/{id}",
    tag = "Assignments",
    params(("id" = Uuid, Path, description = "Assignment id")),
    responses((status = 200, description = "Assignment detail", body = TeacherAssignment))
)]
pub async fn get_assignment(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> AppResult<Json<TeacherAssignment>> {
    let assignment = fetch_assignment_scoped(&state.pool, &actor, id).await?;
    Ok(Json(assignment.try_into()?))
}

#[utoipa::path(
    post,
    path = "/assignments",
    tag = "Assignments",
    request_body = AssignmentCreateRequest,
    responses((status = 201, description = "Assignment proposed", body = TeacherAssignment))
)]
pub async fn create_assignment(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<AssignmentCreateRequest>,
) -> AppResult<(StatusCode, Json<TeacherAssignment>)> {
    policy::ensure_can_create_assignment(&actor, payload.project_id, &state.pool).await?;

    let now = utc_now();
    let assignment_id = Uuid::new_v4();

    // proposals always start unaccepted; only the named teacher flips this
    sqlx::query(
        "INSERT INTO project_teachers (id, project_id, teacher_id, role, accepted, assigned_at, updated_at) \
         VALUES (?, ?, ?, ?, 0, ?, ?)",
    )
    .bind(assignment_id)
    .bind(payload.project_id)
    .bind(payload.teacher_id)
    .bind(payload.role.as_str())
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let assignment: TeacherAssignment =
        fetch_assignment(&state.pool, assignment_id).await?.try_into()?;

    crate::events::log_activity(&state.event_bus, "created", Some(actor.id), &assignment);

    Ok((StatusCode::CREATED, Json(assignment)))
}

#[utoipa::path(
    put,
    path = "/assignments/{id}",
    tag = "Assignments",
    params(("id" = Uuid, Path, description = "Assignment id")),
    request_body = AssignmentUpdateRequest,
    responses((status = 200, description = "Assignment updated", body = TeacherAssignment))
)]
pub async fn update_assignment(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignmentUpdateRequest>,
) -> AppResult<Json<TeacherAssignment>> {
    let mut assignment = fetch_assignment_scoped(&state.pool, &actor, id).await?;
    policy::ensure_can_modify_assignment(
        &actor,
        assignment.teacher_id,
        assignment.project_id,
        &state.pool,
    )
    .await?;

    if let Some(role) = payload.role {
        assignment.role = role.as_str().to_string();
    }
    if let Some(accepted) = payload.accepted {
        assignment.accepted = accepted;
    }

    let now = utc_now();
    sqlx::query("UPDATE project_teachers SET role = ?, accepted = ?, updated_at = ? WHERE id = ?")
        .bind(&assignment.role)
        .bind(assignment.accepted)
        .bind(now)
        .bind(assignment.id)
        .execute(&state.pool)
        .await?;

    assignment.updated_at = now;
    let assignment: TeacherAssignment = assignment.try_into()?;

    crate::events::log_activity(&state.event_bus, "updated", Some(actor.id), &assignment);

    Ok(Json(assignment))
}

#[utoipa::path(
    delete,
    path = "/assignments/{id}",
    tag = "Assignments",
    params(("id" = Uuid, Path, description = "Assignment id")),
    responses((status = 204, description = "Assignment removed"))
)]
pub async fn delete_assignment(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let assignment = fetch_assignment_scoped(&state.pool, &actor, id).await?;
    policy::ensure_can_modify_assignment(
        &actor,
        assignment.teacher_id,
        assignment.project_id,
        &state.pool,
    )
    .await?;

    sqlx::query("DELETE FROM project_teachers WHERE id = ?")
        .bind(assignment.id)
        .execute(&state.pool)
        .await?;

    let assignment: TeacherAssignment = assignment.try_into()?;
    crate::events::log_activity(&state.event_bus, "deleted", Some(actor.id), &assignment);

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/assignments/{id}/accept",
    tag = "Assignments",
    params(("id" = Uuid, Path, description = "Assignment id")),
    responses(
        (status = 200, description = "Assignment accepted", body = TeacherAssignment),
        (status = 403, description = "Only the assigned teacher can accept this role")
    )
)]
pub async fn accept_assignment(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> AppResult<Json<TeacherAssignment>> {
    // resolved outside the visibility scope: a wrong caller must learn they
    // are not the named teacher (403), not that the row is absent
    let mut assignment = fetch_assignment(&state.pool, id).await?;
    policy::ensure_named_teacher(&actor, assignment.teacher_id)?;

    let now = utc_now();
    sqlx::query("UPDATE project_teachers SET accepted = 1, updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(assignment.id)
        .execute(&state.pool)
        .await?;

    assignment.accepted = true;
    assignment.updated_at = now;
    let assignment: TeacherAssignment = assignment.try_into()?;

    crate::events::log_activity(&state.event_bus, "accepted", Some(actor.id), &assignment);

    Ok(Json(assignment))
}

#[utoipa::path(
    post,
    path = "/assignments/{id}/decline",
    tag = "Assignments",
    params(("id" = Uuid, Path, description = "Assignment id")),
    responses(
        (status = 200, description = "Assignment declined and removed"),
        (status = 403, description = "Only the assigned teacher can decline this role")
    )
)]
pub async fn decline_assignment(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let assignment = fetch_assignment(&state.pool, id).await?;
    policy::ensure_named_teacher(&actor, assignment.teacher_id)?;

    // declining removes the row entirely; no declined state is retained
    sqlx::query("DELETE FROM project_teachers WHERE id = ?")
        .bind(assignment.id)
        .execute(&state.pool)
        .await?;

    let assignment: TeacherAssignment = assignment.try_into()?;
    crate::events::log_activity(&state.event_bus, "declined", Some(actor.id), &assignment);

    Ok(Json(serde_json::json!({
        "detail": "Assignment declined and removed."
    })))
}

async fn fetch_assignment_scoped(
    pool: &SqlitePool,
    actor: &Actor,
    assignment_id: Uuid,
) -> AppResult<DbTeacherAssignment> {
    let scope = visibility::assignments(actor, "a");
    let sql = format!(
        "SELECT {ASSIGNMENT_COLUMNS} FROM project_teachers a WHERE a.id = ? AND {}",
        scope.clause
    );

    let mut query = sqlx::query_as::<_, DbTeacherAssignment>(&sql).bind(assignment_id);
    for _ in 0..scope.actor_binds {
        query = query.bind(actor.id);
    }

    query
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("assignment not found"))
}

async fn fetch_assignment(pool: &SqlitePool, assignment_id: Uuid) -> AppResult<DbTeacherAssignment> {
    let sql = format!("SELECT {ASSIGNMENT_COLUMNS} FROM project_teachers a WHERE a.id = ?");
    sqlx::query_as::<_, DbTeacherAssignment>(&sql)
        .bind(assignment_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("assignment not found"))
}
