use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Comment {
    pub id: Uuid,
    pub project_id: Uuid,
    /// Author; null once the account is deleted.
    pub user_id: Option<Uuid>,
    pub comment_text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl crate::events::Loggable for Comment {
    fn entity_type() -> &'static str { "comment" }
    fn subject_id(&self) -> Uuid { self.id }

    fn severity(&self) -> crate::events::Severity {
        crate::events::Severity::Noise
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbComment {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Option<Uuid>,
    pub comment_text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbComment> for Comment {
    type Error = AppError;

    fn try_from(value: DbComment) -> Result<Self, Self::Error> {
        Ok(Comment {
            id: value.id,
            project_id: value.project_id,
            user_id: value.user_id,
            comment_text: value.comment_text,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

/// The author is always the caller; there is deliberately no user field here.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CommentCreateRequest {
    pub project_id: Uuid,
    #[schema(example = "The methodology section needs sources.")]
    pub comment_text: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CommentListQuery {
    pub project_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}
