use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Evaluation {
    pub id: Uuid,
    pub project_id: Uuid,
    pub teacher_id: Option<Uuid>,
    pub evaluation: String,
    pub score: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl crate::events::Loggable for Evaluation {
    fn entity_type() -> &'static str { "evaluation" }
    fn subject_id(&self) -> Uuid { self.id }

    fn severity(&self) -> crate::events::Severity {
        crate::events::Severity::Critical
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbEvaluation {
    pub id: Uuid,
    pub project_id: Uuid,
    pub teacher_id: Option<Uuid>,
    pub evaluation: String,
    pub score: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbEvaluation> for Evaluation {
    type Error = AppError;

    fn try_from(value: DbEvaluation) -> Result<Self, Self::Error> {
        Ok(Evaluation {
            id: value.id,
            project_id: value.project_id,
            teacher_id: value.teacher_id,
            evaluation: value.evaluation,
            score: value.score,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EvaluationCreateRequest {
    pub project_id: Uuid,
    /// Ignored when the caller is a teacher; their own id is recorded.
    pub teacher_id: Option<Uuid>,
    #[schema(example = "Thorough research, weak conclusion chapter.")]
    pub evaluation: String,
    #[schema(example = 85)]
    pub score: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EvaluationUpdateRequest {
    pub evaluation: Option<String>,
    pub score: Option<i32>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct EvaluationListQuery {
    pub project_id: Option<Uuid>,
    pub teacher_id: Option<Uuid>,
}
