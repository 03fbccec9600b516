use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::app::AppState;
use crate::errors::AppError;
use crate::jwt::bearer_token;
use crate::models::user::Role;

/// The authenticated caller. The role is read from the users table on every
/// request rather than trusted from the token, so role changes take effect
/// immediately.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_teacher(&self) -> bool {
        self.role == Role::Teacher
    }

    pub fn is_student(&self) -> bool {
        self.role == Role::Student
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let claims = state.jwt.decode(token)?;

        let role: Option<String> = sqlx::query_scalar("SELECT role FROM users WHERE id = ?")
            .bind(claims.sub)
            .fetch_optional(&state.pool)
            .await?;

        let role = role.ok_or_else(|| AppError::unauthorized("account no longer exists"))?;

        Ok(Actor::new(claims.sub, Role::parse(&role)?))
    }
}
