use std::sync::Arc;

use axum::http::Method;
use axum::routing::{delete, get, post, put};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::errors::AppError;
use crate::events::{init_event_bus, start_activity_listener, EventBus};
use crate::jwt::JwtConfig;
use crate::routes::{
    assignments, auth, comments, consultations, evaluations, health, milestones, projects, users,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    pub event_bus: EventBus,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtConfig, event_bus: EventBus) -> Self {
        Self {
            pool,
            jwt: Arc::new(jwt),
            event_bus,
        }
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let jwt_config = JwtConfig::from_env()?;
    let (event_bus, event_rx) = init_event_bus();
    tokio::spawn(start_activity_listener(event_rx, pool.clone()));

    let state = AppState::new(pool, jwt_config, event_bus);

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me));

    // unauthenticated read path; everything else requires a token
    let public_routes = Router::new()
        .route("/projects", get(projects::public_list_projects))
        .route("/projects/:id", get(projects::public_get_project));

    let project_routes = Router::new()
        .route("/", get(projects::list_projects))
        .route("/", post(projects::create_project))
        .route("/:id", get(projects::get_project))
        .route("/:id", put(projects::update_project))
        .route("/:id", delete(projects::delete_project))
        .route("/:id/submit", post(projects::submit_project))
        .route("/:id/set_visibility", post(projects::set_visibility));

    let assignment_routes = Router::new()
        .route("/", get(assignments::list_assignments))
        .route("/", post(assignments::create_assignment))
        .route("/:id", get(assignments::get_assignment))
        .route("/:id", put(assignments::update_assignment))
        .route("/:id", delete(assignments::delete_assignment))
        .route("/:id/accept", post(assignments::accept_assignment))
        .route("/:id/decline", post(assignments::decline_assignment));

    let milestone_routes = Router::new()
        .route("/", get(milestones::list_milestones))
        .route("/", post(milestones::create_milestone))
        .route("/:id", get(milestones::get_milestone))
        .route("/:id", put(milestones::update_milestone))
        .route("/:id", delete(milestones::delete_milestone))
        .route("/:id/update_completion", post(milestones::update_completion));

    let comment_routes = Router::new()
        .route("/", get(comments::list_comments))
        .route("/", post(comments::create_comment))
        .route("/:id", get(comments::get_comment));

    let consultation_routes = Router::new()
        .route("/", get(consultations::list_consultations))
        .route("/", post(consultations::create_consultation))
        .route("/:id", get(consultations::get_consultation))
        .route("/:id", put(consultations::update_consultation))
        .route("/:id", delete(consultations::delete_consultation));

    let evaluation_routes = Router::new()
        .route("/", get(evaluations::list_evaluations))
        .route("/", post(evaluations::create_evaluation))
        .route("/:id", get(evaluations::get_evaluation))
        .route("/:id", put(evaluations::update_evaluation))
        .route("/:id", delete(evaluations::delete_evaluation));

    let user_routes = Router::new()
        .route("/", get(users::list_users))
        .route("/:id", get(users::get_user));

    let router = Router::new()
        .nest("/auth", auth_routes)
        .nest("/public", public_routes)
        .nest("/projects", project_routes)
        .nest("/assignments", assignment_routes)
        .nest("/milestones", milestone_routes)
        .nest("/comments", comment_routes)
        .nest("/consultations", consultation_routes)
        .nest("/evaluations", evaluation_routes)
        .nest("/users", user_routes)
        .route("/api/health", get(health::health))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(router)
}
