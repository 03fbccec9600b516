use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::models;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::auth::register,
        routes::auth::login,
        routes::auth::me,
        routes::users::list_users,
        routes::users::get_user,
        routes::projects::public_list_projects,
        routes::projects::public_get_project,
        routes::projects::list_projects,
        routes::projects::get_project,
        routes::projects::create_project,
        routes::projects::update_project,
        routes::projects::delete_project,
        routes::projects::submit_project,
        routes::projects::set_visibility,
        routes::assignments::list_assignments,
        routes::assignments::get_assignment,
        routes::assignments::create_assignment,
        routes::assignments::update_assignment,
        routes::assignments::delete_assignment,
        routes::assignments::accept_assignment,
        routes::assignments::decline_assignment,
        routes::milestones::list_milestones,
        routes::milestones::get_milestone,
        routes::milestones::create_milestone,
        routes::milestones::update_milestone,
        routes::milestones::delete_milestone,
        routes::milestones::update_completion,
        routes::comments::list_comments,
        routes::comments::get_comment,
        routes::comments::create_comment,
        routes::consultations::list_consultations,
        routes::consultations::get_consultation,
        routes::consultations::create_consultation,
        routes::consultations::update_consultation,
        routes::consultations::delete_consultation,
        routes::evaluations::list_evaluations,
        routes::evaluations::get_evaluation,
        routes::evaluations::create_evaluation,
        routes::evaluations::update_evaluation,
        routes::evaluations::delete_evaluation,
        routes::health::health
    ),
    components(
        schemas(
            models::user::User,
            models::user::Role,
            models::user::AuthResponse,
            models::user::LoginRequest,
            models::user::RegisterRequest,
            models::project::Project,
            models::project::ProjectPage,
            models::project::ProjectStatus,
            models::project::WorkType,
            models::project::ProjectCreateRequest,
            models::project::ProjectUpdateRequest,
            models::project::SetVisibilityRequest,
            models::assignment::TeacherAssignment,
            models::assignment::TeacherRole,
            models::assignment::AssignmentCreateRequest,
            models::assignment::AssignmentUpdateRequest,
            models::milestone::Milestone,
            models::milestone::MilestoneStatus,
            models::milestone::MilestoneCreateRequest,
            models::milestone::MilestoneUpdateRequest,
            models::milestone::CompletionUpdateRequest,
            models::comment::Comment,
            models::comment::CommentCreateRequest,
            models::consultation::Consultation,
            models::consultation::ConsultationCreateRequest,
            models::consultation::ConsultationUpdateRequest,
            models::evaluation::Evaluation,
            models::evaluation::EvaluationCreateRequest,
            models::evaluation::EvaluationUpdateRequest,
            routes::health::HealthResponse
        )
    ),
    tags(
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Users", description = "User directory"),
        (name = "Public", description = "Unauthenticated project listing"),
        (name = "Projects", description = "Project management"),
        (name = "Assignments", description = "Teacher assignment workflow"),
        (name = "Milestones", description = "Project milestones"),
        (name = "Comments", description = "Project discussion"),
        (name = "Consultations", description = "Consultation records"),
        (name = "Evaluations", description = "Project evaluations"),
        (name = "Health", description = "Service health")
    )
)]
pub struct ApiDoc;

pub fn build_openapi(port: u16) -> anyhow::Result<utoipa::openapi::OpenApi> {
    let mut doc = serde_json::to_value(ApiDoc::openapi())?;

    ensure_security_components(&mut doc);
    ensure_global_security(&mut doc);
    ensure_servers(&mut doc, port);

    Ok(serde_json::from_value(doc)?)
}

pub fn swagger_routes(doc: utoipa::openapi::OpenApi) -> Router {
    let swagger_config = utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"])
        .try_it_out_enabled(true)
        .with_credentials(true)
        .persist_authorization(true);

    let doc_json = Arc::new(serde_json::to_value(&doc).expect("OpenAPI serialization must succeed"));

    let json_route = {
        let doc_json = Arc::clone(&doc_json);
        get(move || {
            let doc_json = Arc::clone(&doc_json);
            async move { Json((*doc_json).clone()) }
        })
    };

    Router::new()
        .route("/api-docs/openapi.json", json_route)
        .merge(SwaggerUi::new("/docs").config(swagger_config))
}

fn ensure_security_components(doc: &mut Value) {
    let components = doc
        .as_object_mut()
        .expect("OpenAPI root must be an object")
        .entry("components")
        .or_insert_with(|| json!({}));

    if let Some(components) = components.as_object_mut() {
        let schemes = components
            .entry("securitySchemes")
            .or_insert_with(|| json!({}));
        if let Some(schemes) = schemes.as_object_mut() {
            schemes.insert(
                "bearerAuth".to_string(),
                json!({
                    "type": "http",
                    "scheme": "bearer",
                    "bearerFormat": "JWT"
                }),
            );
        }
    }
}

fn ensure_global_security(doc: &mut Value) {
    if doc.get("security").is_none() {
        doc["security"] = json!([{ "bearerAuth": [] }]);
    }
}

fn ensure_servers(doc: &mut Value, port: u16) {
    if doc.get("servers").is_none() {
        doc["servers"] = json!([{ "url": format!("http://localhost:{}", port) }]);
    }
}
