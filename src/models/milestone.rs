use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneStatus {
    NotStarted,
    InProgress,
    Completed,
    Overdue,
}

impl MilestoneStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MilestoneStatus::NotStarted => "not_started",
            MilestoneStatus::InProgress => "in_progress",
            MilestoneStatus::Completed => "completed",
            MilestoneStatus::Overdue => "overdue",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "not_started" => Ok(MilestoneStatus::NotStarted),
            "in_progress" => Ok(MilestoneStatus::InProgress),
            "completed" => Ok(MilestoneStatus::Completed),
            "overdue" => Ok(MilestoneStatus::Overdue),
            other => Err(AppError::internal(format!("unknown milestone status in store: {other}"))),
        }
    }
}

/// Forward derivation of status from a completion write. 100 always means
/// completed and any positive value means in progress; zero never regresses
/// the current status.
pub fn derive_status(completion: i32, current: MilestoneStatus) -> MilestoneStatus {
    match completion {
        100 => MilestoneStatus::Completed,
        c if c > 0 => MilestoneStatus::InProgress,
        _ => current,
    }
}

pub fn validate_completion(completion: i32) -> Result<(), AppError> {
    if !(0..=100).contains(&completion) {
        return Err(AppError::bad_request("completion must be between 0 and 100"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Milestone {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: String,
    pub completion: Option<i32>,
    pub deadline: DateTime<Utc>,
    pub status: MilestoneStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl crate::events::Loggable for Milestone {
    fn entity_type() -> &'static str { "milestone" }
    fn subject_id(&self) -> Uuid { self.id }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbMilestone {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: String,
    pub completion: Option<i32>,
    pub deadline: DateTime<Utc>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbMilestone> for Milestone {
    type Error = AppError;

    fn try_from(value: DbMilestone) -> Result<Self, Self::Error> {
        Ok(Milestone {
            id: value.id,
            project_id: value.project_id,
            title: value.title,
            description: value.description,
            completion: value.completion,
            deadline: value.deadline,
            status: MilestoneStatus::parse(&value.status)?,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MilestoneCreateRequest {
    pub project_id: Uuid,
    #[schema(example = "Literature review")]
    pub title: String,
    pub description: String,
    pub completion: Option<i32>,
    #[schema(format = DateTime, example = "2026-01-15T12:00:00Z")]
    pub deadline: DateTime<Utc>,
    pub status: Option<MilestoneStatus>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MilestoneUpdateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completion: Option<i32>,
    pub deadline: Option<DateTime<Utc>>,
    pub status: Option<MilestoneStatus>,
}

/// Body of the `update_completion` action. The raw JSON value is accepted as
/// either number or string so a malformed value surfaces as a validation
/// error rather than a deserialization rejection.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CompletionUpdateRequest {
    #[schema(value_type = i32, example = 75)]
    pub completion: serde_json::Value,
}

impl CompletionUpdateRequest {
    pub fn parse_completion(&self) -> Result<i32, AppError> {
        let value = match &self.completion {
            serde_json::Value::Number(num) => num
                .as_i64()
                .ok_or_else(|| AppError::bad_request("completion must be an integer"))?,
            serde_json::Value::String(raw) => raw
                .trim()
                .parse::<i64>()
                .map_err(|_| AppError::bad_request("completion must be an integer"))?,
            _ => return Err(AppError::bad_request("completion must be an integer")),
        };

        let value = i32::try_from(value)
            .map_err(|_| AppError::bad_request("completion must be between 0 and 100"))?;
        validate_completion(value)?;
        Ok(value)
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct MilestoneListQuery {
    pub project_id: Option<Uuid>,
    pub status: Option<MilestoneStatus>,
}
