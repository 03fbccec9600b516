use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TeacherRole {
    Supervisor,
    Consultant,
    Opponent,
}

impl TeacherRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeacherRole::Supervisor => "supervisor",
            TeacherRole::Consultant => "consultant",
            TeacherRole::Opponent => "opponent",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "supervisor" => Ok(TeacherRole::Supervisor),
            "consultant" => Ok(TeacherRole::Consultant),
            "opponent" => Ok(TeacherRole::Opponent),
            other => Err(AppError::internal(format!("unknown teacher role in store: {other}"))),
        }
    }
}

/// Bridge row between a project and a supervising teacher. `accepted` starts
/// false; only the named teacher flips it (accept) or removes the row
/// (decline).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TeacherAssignment {
    pub id: Uuid,
    pub project_id: Uuid,
    pub teacher_id: Uuid,
    pub role: TeacherRole,
    pub accepted: bool,
    pub assigned_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl crate::events::Loggable for TeacherAssignment {
    fn entity_type() -> &'static str { "assignment" }
    fn subject_id(&self) -> Uuid { self.id }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbTeacherAssignment {
    pub id: Uuid,
    pub project_id: Uuid,
    pub teacher_id: Uuid,
    pub role: String,
    pub accepted: bool,
    pub assigned_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbTeacherAssignment> for TeacherAssignment {
    type Error = AppError;

    fn try_from(value: DbTeacherAssignment) -> Result<Self, Self::Error> {
        Ok(TeacherAssignment {
            id: value.id,
            project_id: value.project_id,
            teacher_id: value.teacher_id,
            role: TeacherRole::parse(&value.role)?,
            accepted: value.accepted,
            assigned_at: value.assigned_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignmentCreateRequest {
    pub project_id: Uuid,
    pub teacher_id: Uuid,
    pub role: TeacherRole,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignmentUpdateRequest {
    pub role: Option<TeacherRole>,
    pub accepted: Option<bool>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AssignmentListQuery {
    pub project_id: Option<Uuid>,
    pub teacher_id: Option<Uuid>,
    pub role: Option<TeacherRole>,
    pub accepted: Option<bool>,
}
