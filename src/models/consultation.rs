use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Consultation {
    pub id: Uuid,
    pub project_id: Uuid,
    pub teacher_id: Option<Uuid>,
    pub notes: Option<String>,
    pub consultation_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl crate::events::Loggable for Consultation {
    fn entity_type() -> &'static str { "consultation" }
    fn subject_id(&self) -> Uuid { self.id }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbConsultation {
    pub id: Uuid,
    pub project_id: Uuid,
    pub teacher_id: Option<Uuid>,
    pub notes: Option<String>,
    pub consultation_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbConsultation> for Consultation {
    type Error = AppError;

    fn try_from(value: DbConsultation) -> Result<Self, Self::Error> {
        Ok(Consultation {
            id: value.id,
            project_id: value.project_id,
            teacher_id: value.teacher_id,
            notes: value.notes,
            consultation_date: value.consultation_date,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ConsultationCreateRequest {
    pub project_id: Uuid,
    /// Ignored when the caller is a teacher; their own id is recorded.
    pub teacher_id: Option<Uuid>,
    pub notes: Option<String>,
    #[schema(format = DateTime, example = "2026-02-10T14:00:00Z")]
    pub consultation_date: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ConsultationUpdateRequest {
    pub notes: Option<String>,
    pub consultation_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ConsultationListQuery {
    pub project_id: Option<Uuid>,
    pub teacher_id: Option<Uuid>,
}
