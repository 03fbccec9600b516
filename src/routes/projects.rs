use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{policy, visibility, Actor};
use crate::errors::{AppError, AppResult};
use crate::models::project::{
    keywords_to_json, DbProject, Project, ProjectCreateRequest, ProjectListQuery, ProjectPage,
    ProjectStatus, ProjectUpdateRequest, SetVisibilityRequest, WorkType, PAGE_SIZE,
};
use crate::utils::{utc_now, validate_project_year};

const PROJECT_COLUMNS: &str = "p.id, p.title, p.description, p.year, p.field, p.keywords, \
     p.student_id, p.thumbnail, p.document, p.poster, p.video, p.public_visibility, \
     p.status, p.type_of_work, p.deleted, p.created_at, p.updated_at";

#[utoipa::path(
    get,
    path = "/projects",
    tag = "Projects",
    params(
        ("year" = Option<i32>, Query, description = "Filter by year"),
        ("field" = Option<String>, Query, description = "Filter by field of study"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("type_of_work" = Option<String>, Query, description = "Filter by type of work"),
        ("search" = Option<String>, Query, description = "Search in title, description and keywords"),
        ("keywords" = Option<String>, Query, description = "Comma-separated keywords, all required"),
        ("ordering" = Option<String>, Query, description = "Ordering fields, e.g. -year,title"),
        ("page" = Option<u32>, Query, description = "1-based page number")
    ),
    responses((status = 200, description = "Projects visible to the caller", body = ProjectPage))
)]
pub async fn list_projects(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<ProjectListQuery>,
) -> AppResult<Json<ProjectPage>> {
    let scope = visibility::projects(&actor, "p");
    list_page(&state.pool, &scope, Some(&actor), &query).await.map(Json)
}

#[utoipa::path(
    get,
    path = "/public/projects",
    tag = "Public",
    params(
        ("year" = Option<i32>, Query, description = "Filter by year"),
        ("field" = Option<String>, Query, description = "Filter by field of study"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("type_of_work" = Option<String>, Query, description = "Filter by type of work"),
        ("search" = Option<String>, Query, description = "Search in title, description and keywords"),
        ("keywords" = Option<String>, Query, description = "Comma-separated keywords, all required"),
        ("ordering" = Option<String>, Query, description = "Ordering fields, e.g. -year,title"),
        ("page" = Option<u32>, Query, description = "1-based page number")
    ),
    responses((status = 200, description = "Publicly visible projects", body = ProjectPage))
)]
pub async fn public_list_projects(
    State(state): State<AppState>,
    Query(query): Query<ProjectListQuery>,
) -> AppResult<Json<ProjectPage>> {
    let scope = visibility::public_projects("p");
    list_page(&state.pool, &scope, None, &query).await.map(Json)
}

#[utoipa::path(
    get,
    path = "/public/projects/{id}",
    tag = "Public",
    params(("id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 200, description = "Public project detail", body = Project),
        (status = 404, description = "Project not found or not public")
    )
)]
pub async fn public_get_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Project>> {
    let scope = visibility::public_projects("p");
    let sql = format!(
        "SELECT {PROJECT_COLUMNS} FROM projects p WHERE p.id = ? AND {}",
        scope.clause
    );

    let row = sqlx::query_as::<_, DbProject>(&sql)
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::not_found("project not found"))?;

    Ok(Json(row.try_into()?))
}

#[utoipa::path(
    get,
    path = "/projects/{id}",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "Project id")),
    responses((status = 200, description = "Project detail", body = Project))
)]
pub async fn get_project(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Project>> {
    let project = fetch_project_scoped(&state.pool, &actor, id).await?;
    Ok(Json(project.try_into()?))
}

#[utoipa::path(
    post,
    path = "/projects",
    tag = "Projects",
    request_body = ProjectCreateRequest,
    responses((status = 201, description = "Project created", body = Project))
)]
pub async fn create_project(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<ProjectCreateRequest>,
) -> AppResult<(StatusCode, Json<Project>)> {
    policy::ensure_can_create_project(&actor)?;
    validate_project_year(payload.year)?;

    // students always own what they create; privileged callers may name an
    // owner explicitly
    let student_id = if actor.is_student() {
        Some(actor.id)
    } else {
        payload.student_id
    };

    let now = utc_now();
    let project_id = Uuid::new_v4();
    let status = payload.status.unwrap_or(ProjectStatus::Draft);
    let type_of_work = payload.type_of_work.unwrap_or(WorkType::Soc);

    sqlx::query(
        "INSERT INTO projects (id, title, description, year, field, keywords, student_id, \
         thumbnail, document, poster, video, public_visibility, status, type_of_work, deleted, \
         created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)",
    )
    .bind(project_id)
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(payload.year)
    .bind(&payload.field)
    .bind(keywords_to_json(&payload.keywords))
    .bind(student_id)
    .bind(&payload.thumbnail)
    .bind(&payload.document)
    .bind(&payload.poster)
    .bind(&payload.video)
    .bind(payload.public_visibility.unwrap_or(false))
    .bind(status.as_str())
    .bind(type_of_work.as_str())
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let project: Project = fetch_project(&state.pool, project_id).await?.try_into()?;

    crate::events::log_activity(&state.event_bus, "created", Some(actor.id), &project);

    Ok((StatusCode::CREATED, Json(project)))
}

#[utoipa::path(
    put,
    path = "/projects/{id}",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "Project id")),
    request_body = ProjectUpdateRequest,
    responses((status = 200, description = "Project updated", body = Project))
)]
pub async fn update_project(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProjectUpdateRequest>,
) -> AppResult<Json<Project>> {
    let mut project = fetch_project_scoped(&state.pool, &actor, id).await?;
    policy::ensure_can_modify_project(&actor, project.id, project.student_id, &state.pool).await?;

    let old: Project = project.clone().try_into()?;

    if let Some(title) = payload.title {
        project.title = title;
    }
    if let Some(description) = payload.description {
        project.description = description;
    }
    if let Some(year) = payload.year {
        validate_project_year(year)?;
        project.year = year;
    }
    if let Some(field) = payload.field {
        project.field = field;
    }
    if let Some(keywords) = payload.keywords.as_deref() {
        project.keywords = keywords_to_json(keywords);
    }
    if let Some(student_id) = payload.student_id {
        project.student_id = Some(student_id);
    }
    if payload.thumbnail.is_some() {
        project.thumbnail = payload.thumbnail;
    }
    if payload.document.is_some() {
        project.document = payload.document;
    }
    if payload.poster.is_some() {
        project.poster = payload.poster;
    }
    if payload.video.is_some() {
        project.video = payload.video;
    }
    if let Some(public_visibility) = payload.public_visibility {
        project.public_visibility = public_visibility;
    }
    if let Some(status) = payload.status {
        project.status = status.as_str().to_string();
    }
    if let Some(type_of_work) = payload.type_of_work {
        project.type_of_work = type_of_work.as_str().to_string();
    }

    let now = utc_now();

    sqlx::query(
        "UPDATE projects SET title = ?, description = ?, year = ?, field = ?, keywords = ?, \
         student_id = ?, thumbnail = ?, document = ?, poster = ?, video = ?, \
         public_visibility = ?, status = ?, type_of_work = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&project.title)
    .bind(&project.description)
    .bind(project.year)
    .bind(&project.field)
    .bind(&project.keywords)
    .bind(project.student_id)
    .bind(&project.thumbnail)
    .bind(&project.document)
    .bind(&project.poster)
    .bind(&project.video)
    .bind(project.public_visibility)
    .bind(&project.status)
    .bind(&project.type_of_work)
    .bind(now)
    .bind(project.id)
    .execute(&state.pool)
    .await?;

    project.updated_at = now;
    let project: Project = project.try_into()?;

    crate::events::log_activity_with_old(&state.event_bus, "updated", Some(actor.id), &project, Some(&old));

    Ok(Json(project))
}

#[utoipa::path(
    delete,
    path = "/projects/{id}",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "Project id")),
    responses((status = 204, description = "Project soft deleted"))
)]
pub async fn delete_project(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let project = fetch_project_scoped(&state.pool, &actor, id).await?;
    policy::ensure_can_modify_project(&actor, project.id, project.student_id, &state.pool).await?;

    // one-way transition; the row stays but leaves every visibility path
    let now = utc_now();
    sqlx::query("UPDATE projects SET deleted = 1, updated_at = ? WHERE id = ? AND deleted = 0")
        .bind(now)
        .bind(id)
        .execute(&state.pool)
        .await?;

    let project: Project = project.try_into()?;
    crate::events::log_activity(&state.event_bus, "deleted", Some(actor.id), &project);

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/projects/{id}/submit",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 200, description = "Project submitted", body = Project),
        (status = 400, description = "No document attached"),
        (status = 403, description = "Not allowed to submit this project")
    )
)]
pub async fn submit_project(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Project>> {
    let mut project = fetch_project_scoped(&state.pool, &actor, id).await?;
    policy::ensure_can_modify_project(&actor, project.id, project.student_id, &state.pool).await?;

    if project.document.is_none() {
        return Err(AppError::precondition_failed(
            "cannot submit project without attached document",
        ));
    }

    let now = utc_now();
    sqlx::query("UPDATE projects SET status = ?, updated_at = ? WHERE id = ?")
        .bind(ProjectStatus::Submitted.as_str())
        .bind(now)
        .bind(project.id)
        .execute(&state.pool)
        .await?;

    project.status = ProjectStatus::Submitted.as_str().to_string();
    project.updated_at = now;
    let project: Project = project.try_into()?;

    crate::events::log_activity(&state.event_bus, "submitted", Some(actor.id), &project);

    Ok(Json(project))
}

#[utoipa::path(
    post,
    path = "/projects/{id}/set_visibility",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "Project id")),
    request_body = SetVisibilityRequest,
    responses(
        (status = 200, description = "Visibility updated", body = Project),
        (status = 403, description = "Only project teachers or administrators can change visibility")
    )
)]
pub async fn set_visibility(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetVisibilityRequest>,
) -> AppResult<Json<Project>> {
    // resolved outside the visibility scope: an unauthorized caller is told
    // they lack the permission, not that the project is absent
    let mut project = fetch_project(&state.pool, id).await?;
    if project.deleted {
        return Err(AppError::not_found("project not found"));
    }
    policy::ensure_can_set_visibility(&actor, project.id, &state.pool).await?;

    let now = utc_now();
    sqlx::query("UPDATE projects SET public_visibility = ?, updated_at = ? WHERE id = ?")
        .bind(payload.public_visibility)
        .bind(now)
        .bind(project.id)
        .execute(&state.pool)
        .await?;

    project.public_visibility = payload.public_visibility;
    project.updated_at = now;
    let project: Project = project.try_into()?;

    crate::events::log_activity(&state.event_bus, "visibility_changed", Some(actor.id), &project);

    Ok(Json(project))
}

async fn list_page(
    pool: &SqlitePool,
    scope: &visibility::Scope,
    actor: Option<&Actor>,
    query: &ProjectListQuery,
) -> AppResult<ProjectPage> {
    let mut where_sql = scope.clause.clone();
    query.push_filters(&mut where_sql, "p");
    let binds = query.filter_binds();

    let count_sql = format!("SELECT COUNT(1) FROM projects p WHERE {where_sql}");
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    if let Some(actor) = actor {
        for _ in 0..scope.actor_binds {
            count_query = count_query.bind(actor.id);
        }
    }
    for bind in &binds {
        count_query = count_query.bind(bind.clone());
    }
    let count = count_query.fetch_one(pool).await?;

    let (limit, offset) = query.limit_offset();
    let sql = format!(
        "SELECT {PROJECT_COLUMNS} FROM projects p WHERE {where_sql} {} LIMIT ? OFFSET ?",
        query.order_clause("p")
    );

    let mut rows_query = sqlx::query_as::<_, DbProject>(&sql);
    if let Some(actor) = actor {
        for _ in 0..scope.actor_binds {
            rows_query = rows_query.bind(actor.id);
        }
    }
    for bind in &binds {
        rows_query = rows_query.bind(bind.clone());
    }
    rows_query = rows_query.bind(limit).bind(offset);

    let rows = rows_query.fetch_all(pool).await?;
    let results: Vec<Project> = rows.into_iter().map(Project::try_from).collect::<Result<_, _>>()?;

    Ok(ProjectPage {
        count,
        page: query.page_number(),
        page_size: PAGE_SIZE,
        results,
    })
}

/// Resolves a project through the caller's visibility scope; anything outside
/// it is reported as absent.
async fn fetch_project_scoped(pool: &SqlitePool, actor: &Actor, project_id: Uuid) -> AppResult<DbProject> {
    let scope = visibility::projects(actor, "p");
    let sql = format!(
        "SELECT {PROJECT_COLUMNS} FROM projects p WHERE p.id = ? AND {}",
        scope.clause
    );

    let mut query = sqlx::query_as::<_, DbProject>(&sql).bind(project_id);
    for _ in 0..scope.actor_binds {
        query = query.bind(actor.id);
    }

    query
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("project not found"))
}

async fn fetch_project(pool: &SqlitePool, project_id: Uuid) -> AppResult<DbProject> {
    let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects p WHERE p.id = ?");
    sqlx::query_as::<_, DbProject>(&sql)
        .bind(project_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("project not found"))
}
