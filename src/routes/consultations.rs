use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{policy, visibility, Actor};
use crate::errors::{AppError, AppResult};
use crate::models::consultation::{
    Consultation, ConsultationCreateRequest, ConsultationListQuery, ConsultationUpdateRequest,
    DbConsultation,
};
use crate::utils::utc_now;

const CONSULTATION_COLUMNS: &str =
    "c.id, c.project_id, c.teacher_id, c.notes, c.consultation_date, c.created_at, c.updated_at";

#[utoipa::path(
    get,
    path = "/consultations",
    tag = "Consultations",
    params(
        ("project_id" = Option<Uuid>, Query, description = "Filter by project"),
        ("teacher_id" = Option<Uuid>, Query, description = "Filter by teacher")
    ),
    responses((status = 200, description = "Consultations visible to the caller", body = [Consultation]))
)]
pub async fn list_consultations(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<ConsultationListQuery>,
) -> AppResult<Json<Vec<Consultation>>> {
    let scope = visibility::consultations(&actor, "c");

    let mut sql = format!(
        "SELECT {CONSULTATION_COLUMNS} FROM consultations c WHERE {}",
        scope.clause
    );
    if query.project_id.is_some() {
        sql.push_str(" AND c.project_id = ?");
    }
    if query.teacher_id.is_some() {
        sql.push_str(" AND c.teacher_id = ?");
    }
    sql.push_str(" ORDER BY c.consultation_date DESC");

    let mut q = sqlx::query_as::<_, DbConsultation>(&sql);
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
    let consultations: Vec<Consultation> =
        rows.into_iter().map(Consultation::try_from).collect::<Result<_, _>>()?;

    Ok(Json(consultations))
}

#[utoipa::path(
    get,
    path = "/consultations/{id}",
    tag = "Consultations",
    params(("id" = Uuid, Path, description = "Consultation id")),
    responses((status = 200, description = "Consultation detail", body = Consultation))
)]
pub async fn get_consultation(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Consultation>> {
    let consultation = fetch_consultation_scoped(&state.pool, &actor, id).await?;
    Ok(Json(consultation.try_into()?))
}

#[utoipa::path(
    post,
    path = "/consultations",
    tag = "Consultations",
    request_body = ConsultationCreateRequest,
    responses((status = 201, description = "Consultation recorded", body = Consultation))
)]
pub async fn create_consultation(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<ConsultationCreateRequest>,
) -> AppResult<(StatusCode, Json<Consultation>)> {
    policy::ensure_supervision_write(&actor, payload.project_id, &state.pool).await?;

    // teachers always record themselves; admins may name any teacher
    let teacher_id = if actor.is_teacher() {
        Some(actor.id)
    } else {
        payload.teacher_id
    };

    let now = utc_now();
    let consultation_id = Uuid::new_v4();

    sqlx::query(
        "INSERT INTO consultations (id, project_id, teacher_id, notes, consultation_date, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(consultation_id)
    .bind(payload.project_id)
    .bind(teacher_id)
    .bind(&payload.notes)
    .bind(payload.consultation_date)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let consultation: Consultation =
        fetch_consultation(&state.pool, consultation_id).await?.try_into()?;

    crate::events::log_activity(&state.event_bus, "created", Some(actor.id), &consultation);

    Ok((StatusCode::CREATED, Json(consultation)))
}

#[utoipa::path(
    put,
    path = "/consultations/{id}",
    tag = "Consultations",
    params(("id" = Uuid, Path, description = "Consultation id")),
    request_body = ConsultationUpdateRequest,
    responses((status = 200, description = "Consultation updated", body = Consultation))
)]
pub async fn update_consultation(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConsultationUpdateRequest>,
) -> AppResult<Json<Consultation>> {
    let mut consultation = fetch_consultation_scoped(&state.pool, &actor, id).await?;
    policy::ensure_supervision_write(&actor, consultation.project_id, &state.pool).await?;

    if payload.notes.is_some() {
        consultation.notes = payload.notes;
    }
    if let Some(consultation_date) = payload.consultation_date {
        consultation.consultation_date = consultation_date;
    }

    let now = utc_now();
    sqlx::query(
        "UPDATE consultations SET notes = ?, consultation_date = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&consultation.notes)
    .bind(consultation.consultation_date)
    .bind(now)
    .bind(consultation.id)
    .execute(&state.pool)
    .await?;

    consultation.updated_at = now;
    let consultation: Consultation = consultation.try_into()?;

    crate::events::log_activity(&state.event_bus, "updated", Some(actor.id), &consultation);

    Ok(Json(consultation))
}

#[utoipa::path(
    delete,
    path = "/consultations/{id}",
    tag = "Consultations",
    params(("id" = Uuid, Path, description = "Consultation id")),
    responses((status = 204, description = "Consultation removed"))
)]
pub async fn delete_consultation(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let consultation = fetch_consultation_scoped(&state.pool, &actor, id).await?;
    policy::ensure_supervision_write(&actor, consultation.project_id, &state.pool).await?;

    sqlx::query("DELETE FROM consultations WHERE id = ?")
        .bind(consultation.id)
        .execute(&state.pool)
        .await?;

    let consultation: Consultation = consultation.try_into()?;
    crate::events::log_activity(&state.event_bus, "deleted", Some(actor.id), &consultation);

    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_consultation_scoped(
    pool: &SqlitePool,
    actor: &Actor,
    consultation_id: Uuid,
) -> AppResult<DbConsultation> {
    let scope = visibility::consultations(actor, "c");
    let sql = format!(
        "SELECT {CONSULTATION_COLUMNS} FROM consultations c WHERE c.id = ? AND {}",
        scope.clause
    );

    let mut query = sqlx::query_as::<_, DbConsultation>(&sql).bind(consultation_id);
    for _ in 0..scope.actor_binds {
        query = query.bind(actor.id);
    }

    query
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("consultation not found"))
}

async fn fetch_consultation(pool: &SqlitePool, consultation_id: Uuid) -> AppResult<DbConsultation> {
    let sql = format!("SELECT {CONSULTATION_COLUMNS} FROM consultations c WHERE c.id = ?");
    sqlx::query_as::<_, DbConsultation>(&sql)
        .bind(consultation_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("consultation not found"))
}
