use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;

pub const PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Draft,
    InProgress,
    Submitted,
    Evaluated,
    Completed,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Draft => "draft",
            ProjectStatus::InProgress => "in_progress",
            ProjectStatus::Submitted => "submitted",
            ProjectStatus::Evaluated => "evaluated",
            ProjectStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "draft" => Ok(ProjectStatus::Draft),
            "in_progress" => Ok(ProjectStatus::InProgress),
            "submitted" => Ok(ProjectStatus::Submitted),
            "evaluated" => Ok(ProjectStatus::Evaluated),
            "completed" => Ok(ProjectStatus::Completed),
            other => Err(AppError::internal(format!("unknown project status in store: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum WorkType {
    /// Středoškolská odborná činnost
    #[serde(rename = "SOČ")]
    Soc,
    #[serde(rename = "seminar")]
    Seminar,
    #[serde(rename = "other")]
    Other,
}

impl WorkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkType::Soc => "SOČ",
            WorkType::Seminar => "seminar",
            WorkType::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "SOČ" => Ok(WorkType::Soc),
            "seminar" => Ok(WorkType::Seminar),
            "other" => Ok(WorkType::Other),
            other => Err(AppError::internal(format!("unknown work type in store: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub year: i32,
    pub field: String,
    pub keywords: Vec<String>,
    pub student_id: Option<Uuid>,
    pub thumbnail: Option<String>,
    pub document: Option<String>,
    pub poster: Option<String>,
    pub video: Option<String>,
    pub public_visibility: bool,
    pub status: ProjectStatus,
    pub type_of_work: WorkType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl crate::events::Loggable for Project {
    fn entity_type() -> &'static str { "project" }
    fn subject_id(&self) -> Uuid { self.id }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbProject {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub year: i32,
    pub field: String,
    /// JSON array of strings, e.g. `["robotics","ai"]`.
    pub keywords: String,
    pub student_id: Option<Uuid>,
    pub thumbnail: Option<String>,
    pub document: Option<String>,
    pub poster: Option<String>,
    pub video: Option<String>,
    pub public_visibility: bool,
    pub status: String,
    pub type_of_work: String,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbProject> for Project {
    type Error = AppError;

    fn try_from(value: DbProject) -> Result<Self, Self::Error> {
        let keywords: Vec<String> = serde_json::from_str(&value.keywords)
            .map_err(|err| AppError::internal(format!("malformed keywords column: {err}")))?;

        Ok(Project {
            id: value.id,
            title: value.title,
            description: value.description,
            year: value.year,
            field: value.field,
            keywords,
            student_id: value.student_id,
            thumbnail: value.thumbnail,
            document: value.document,
            poster: value.poster,
            video: value.video,
            public_visibility: value.public_visibility,
            status: ProjectStatus::parse(&value.status)?,
            type_of_work: WorkType::parse(&value.type_of_work)?,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

pub fn keywords_to_json(keywords: &[String]) -> String {
    serde_json::to_string(keywords).unwrap_or_else(|_| "[]".to_string())
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProjectCreateRequest {
    #[schema(example = "Autonomous greenhouse")]
    pub title: String,
    #[schema(example = "A self-regulating greenhouse controller.")]
    pub description: String,
    #[schema(example = 2025)]
    pub year: i32,
    #[schema(example = "informatics")]
    pub field: String,
    pub keywords: Vec<String>,
    /// Owner; ignored for student callers, who always own what they create.
    pub student_id: Option<Uuid>,
    pub thumbnail: Option<String>,
    pub document: Option<String>,
    pub poster: Option<String>,
    pub video: Option<String>,
    pub public_visibility: Option<bool>,
    pub status: Option<ProjectStatus>,
    pub type_of_work: Option<WorkType>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProjectUpdateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub year: Option<i32>,
    pub field: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub student_id: Option<Uuid>,
    pub thumbnail: Option<String>,
    pub document: Option<String>,
    pub poster: Option<String>,
    pub video: Option<String>,
    pub public_visibility: Option<bool>,
    pub status: Option<ProjectStatus>,
    pub type_of_work: Option<WorkType>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetVisibilityRequest {
    pub public_visibility: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProjectPage {
    pub count: i64,
    pub page: u32,
    pub page_size: u32,
    pub results: Vec<Project>,
}

/// Secondary filters composable on top of the visibility scope. All binds are
/// textual; SQLite column affinity handles the year comparison.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ProjectListQuery {
    pub year: Option<i32>,
    pub field: Option<String>,
    pub status: Option<String>,
    pub type_of_work: Option<String>,
    /// Substring search over title, description and keywords.
    pub search: Option<String>,
    /// Comma-separated keywords; a project must contain every one of them.
    pub keywords: Option<String>,
    /// Comma-separated ordering fields, `-` prefix for descending.
    pub ordering: Option<String>,
    /// 1-based page number; pages are fixed at 20 records.
    pub page: Option<u32>,
}

const ORDERABLE_FIELDS: &[&str] = &["title", "year", "created_at", "updated_at"];

impl ProjectListQuery {
    /// Appends ` AND ...` fragments for every present filter. Bind values are
    /// produced in the same order by [`Self::filter_binds`].
    pub fn push_filters(&self, sql: &mut String, alias: &str) {
        if self.year.is_some() {
            sql.push_str(&format!(" AND {alias}.year = ?"));
        }
        if self.field.is_some() {
            sql.push_str(&format!(" AND {alias}.field = ?"));
        }
        if self.status.is_some() {
            sql.push_str(&format!(" AND {alias}.status = ?"));
        }
        if self.type_of_work.is_some() {
            sql.push_str(&format!(" AND {alias}.type_of_work = ?"));
        }
        if self.search.is_some() {
            sql.push_str(&format!(
                " AND ({alias}.title LIKE ? OR {alias}.description LIKE ? OR {alias}.keywords LIKE ?)"
            ));
        }
        for _ in self.keyword_list() {
            sql.push_str(&format!(" AND {alias}.keywords LIKE ?"));
        }
    }

    pub fn filter_binds(&self) -> Vec<String> {
        let mut binds = Vec::new();
        if let Some(year) = self.year {
            binds.push(year.to_string());
        }
        if let Some(field) = &self.field {
            binds.push(field.clone());
        }
        if let Some(status) = &self.status {
            binds.push(status.clone());
        }
        if let Some(type_of_work) = &self.type_of_work {
            binds.push(type_of_work.clone());
        }
        if let Some(search) = &self.search {
            let pattern = format!("%{}%", search);
            binds.push(pattern.clone());
            binds.push(pattern.clone());
            binds.push(pattern);
        }
        for keyword in self.keyword_list() {
            // keywords are stored as a JSON array, so an exact element match
            // is a quoted substring
            binds.push(format!("%\"{}\"%", keyword));
        }
        binds
    }

    fn keyword_list(&self) -> Vec<String> {
        self.keywords
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|kw| !kw.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Builds the ORDER BY list from the whitelist, defaulting to
    /// `-year,title`. Unknown fields are skipped.
    pub fn order_clause(&self, alias: &str) -> String {
        let requested = self.ordering.as_deref().unwrap_or("-year,title");

        let mut parts = Vec::new();
        for raw in requested.split(',') {
            let raw = raw.trim();
            let (name, direction) = match raw.strip_prefix('-') {
                Some(name) => (name, "DESC"),
                None => (raw, "ASC"),
            };
            if ORDERABLE_FIELDS.contains(&name) {
                parts.push(format!("{alias}.{name} {direction}"));
            }
        }

        if parts.is_empty() {
            parts.push(format!("{alias}.year DESC"));
            parts.push(format!("{alias}.title ASC"));
        }

        format!("ORDER BY {}", parts.join(", "))
    }

    pub fn limit_offset(&self) -> (u32, u32) {
        let page = self.page.unwrap_or(1).max(1);
        (PAGE_SIZE, (page - 1) * PAGE_SIZE)
    }

    pub fn page_number(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ordering_is_year_desc_title_asc() {
        let query = ProjectListQuery::default();
        assert_eq!(query.order_clause("p"), "ORDER BY p.year DESC, p.title ASC");
    }

    #[test]
    fn unknown_ordering_fields_are_skipped() {
        let query = ProjectListQuery {
            ordering: Some("-created_at,evil; DROP TABLE projects,title".to_string()),
            ..Default::default()
        };
        assert_eq!(
            query.order_clause("p"),
            "ORDER BY p.created_at DESC, p.title ASC"
        );
    }

    #[test]
    fn fully_unknown_ordering_falls_back_to_default() {
        let query = ProjectListQuery {
            ordering: Some("bogus".to_string()),
            ..Default::default()
        };
        assert_eq!(query.order_clause("p"), "ORDER BY p.year DESC, p.title ASC");
    }

    #[test]
    fn keyword_filters_require_every_keyword() {
        let query = ProjectListQuery {
            keywords: Some("ai, robotics".to_string()),
            ..Default::default()
        };

        let mut sql = String::new();
        query.push_filters(&mut sql, "p");
        assert_eq!(sql.matches("p.keywords LIKE ?").count(), 2);
        assert_eq!(query.filter_binds(), vec!["%\"ai\"%", "%\"robotics\"%"]);
    }

    #[test]
    fn search_binds_three_patterns() {
        let query = ProjectListQuery {
            search: Some("solar".to_string()),
            ..Default::default()
        };
        assert_eq!(query.filter_binds(), vec!["%solar%", "%solar%", "%solar%"]);
    }
}
