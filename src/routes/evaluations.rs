use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{policy, visibility, Actor};
use crate::errors::{AppError, AppResult};
use crate::models::evaluation::{
    DbEvaluation, Evaluation, EvaluationCreateRequest, EvaluationListQuery, EvaluationUpdateRequest,
};
use crate::utils::utc_now;

const EVALUATION_COLUMNS: &str =
    "e.id, e.project_id, e.teacher_id, e.evaluation, e.score, e.created_at, e.updated_at";

#[utoipa::path(
    get,
    path = "/evaluations",
    tag = "Evaluations",
    params(
        ("project_id" = Option<Uuid>, Query, description = "Filter by project"),
        ("teacher_id" = Option<Uuid>, Query, description = "Filter by teacher")
    ),
    responses((status = 200, description = "Evaluations visible to the caller", body = [Evaluation]))
)]
pub async fn list_evaluations(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<EvaluationListQuery>,
) -> AppResult<Json<Vec<Evaluation>>> {
    let scope = visibility::evaluations(&actor, "e");

    let mut sql = format!(
        "SELECT {EVALUATION_COLUMNS} FROM project_evaluations e WHERE {}",
        scope.clause
    );
    if query.project_id.is_some() {
        sql.push_str(" AND e.project_id = ?");
    }
    if query.teacher_id.is_some() {
        sql.push_str(" AND e.teacher_id = ?");
    }
    sql.push_str(" ORDER BY e.created_at DESC");

    let mut q = sqlx::query_as::<_, DbEvaluation>(&sql);
    for _ in 0..scope.actor_binds {
        q = q.bind(actor.id);
    }
    if let Some(project_id) = query.project_id {
        q = q.bind(project_id);
    }
    if let Some(teacher_id) = query.teacher_id {
        q = q.bind(teacher_id);
    }

    let rows = q.fetch_all(&state.pool).await?;
    let evaluations: Vec<Evaluation> =
        rows.into_iter().map(Evaluation::try_from).collect::<Result<_, _>>()?;

    Ok(Json(evaluations))
}

#[utoipa::path(
    get,
    path = "/evaluations/{id}",
    tag = "Evaluations",
    params(("id" = Uuid, Path, description = "Evaluation id")),
    responses((status = 200, description = "Evaluation detail", body = Evaluation))
)]
pub async fn get_evaluation(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Evaluation>> {
    let evaluation = fetch_evaluation_scoped(&state.pool, &actor, id).await?;
    Ok(Json(evaluation.try_into()?))
}

#[utoipa::path(
    post,
    path = "/evaluations",
    tag = "Evaluations",
    request_body = EvaluationCreateRequest,
    responses((status = 201, description = "Evaluation recorded", body = Evaluation))
)]
pub async fn create_evaluation(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<EvaluationCreateRequest>,
) -> AppResult<(StatusCode, Json<Evaluation>)> {
    policy::ensure_supervision_write(&actor, payload.project_id, &state.pool).await?;

    let teacher_id = if actor.is_teacher() {
        Some(actor.id)
    } else {
        payload.teacher_id
    };

    let now = utc_now();
    let evaluation_id = Uuid::new_v4();

    sqlx::query(
        "INSERT INTO project_evaluations (id, project_id, teacher_id, evaluation, score, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(evaluation_id)
    .bind(payload.project_id)
    .bind(teacher_id)
    .bind(&payload.evaluation)
    .bind(payload.score)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let evaluation: Evaluation = fetch_evaluation(&state.pool, evaluation_id).await?.try_into()?;

    crate::events::log_activity(&state.event_bus, "created", Some(actor.id), &evaluation);

    Ok((StatusCode::CREATED, Json(evaluation)))
}

#[utoipa::path(
    put,
    path = "/evaluations/{id}",
    tag = "Evaluations",
    params(("id" = Uuid, Path, description = "Evaluation id")),
    request_body = EvaluationUpdateRequest,
    responses((status = 200, description = "Evaluation updated", body = Evaluation))
)]
pub async fn update_evaluation(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<EvaluationUpdateRequest>,
) -> AppResult<Json<Evaluation>> {
    let mut evaluation = fetch_evaluation_scoped(&state.pool, &actor, id).await?;
    policy::ensure_supervision_write(&actor, evaluation.project_id, &state.pool).await?;

    if let Some(text) = payload.evaluation {
        evaluation.evaluation = text;
    }
    if let Some(score) = payload.score {
        evaluation.score = score;
    }

    let now = utc_now();
    sqlx::query("UPDATE project_evaluations SET evaluation = ?, score = ?, updated_at = ? WHERE id = ?")
        .bind(&evaluation.evaluation)
        .bind(evaluation.score)
        .bind(now)
        .bind(evaluation.id)
        .execute(&state.pool)
        .await?;

    evaluation.updated_at = now;
    let evaluation: Evaluation = evaluation.try_into()?;

    crate::events::log_activity(&state.event_bus, "updated", Some(actor.id), &evaluation);

    Ok(Json(evaluation))
}

#[utoipa::path(
    delete,
    path = "/evaluations/{id}",
    tag = "Evaluations",
    params(("id" = Uuid, Path, description = "Evaluation id")),
    responses((status = 204, description = "Evaluation removed"))
)]
pub async fn delete_evaluation(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let evaluation = fetch_evaluation_scoped(&state.pool, &actor, id).await?;
    policy::ensure_supervision_write(&actor, evaluation.project_id, &state.pool).await?;

    sqlx::query("DELETE FROM project_evaluations WHERE id = ?")
        .bind(evaluation.id)
        .execute(&state.pool)
        .await?;

    let evaluation: Evaluation = evaluation.try_into()?;
    crate::events::log_activity(&state.event_bus, "deleted", Some(actor.id), &evaluation);

    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_evaluation_scoped(
    pool: &SqlitePool,
    actor: &Actor,
    evaluation_id: Uuid,
) -> AppResult<DbEvaluation> {
    let scope = visibility::evaluations(actor, "e");
    let sql = format!(
        "SELECT {EVALUATION_COLUMNS} FROM project_evaluations e WHERE e.id = ? AND {}",
        scope.clause
    );

    let mut query = sqlx::query_as::<_, DbEvaluation>(&sql).bind(evaluation_id);
    for _ in 0..scope.actor_binds {
        query = query.bind(actor.id);
    }

    query
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("evaluation not found"))
}

async fn fetch_evaluation(pool: &SqlitePool, evaluation_id: Uuid) -> AppResult<DbEvaluation> {
    let sql = format!("SELECT {EVALUATION_COLUMNS} FROM project_evaluations e WHERE e.id = ?");
    sqlx::query_as::<_, DbEvaluation>(&sql)
        .bind(evaluation_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("evaluation not found"))
}
