use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use uuid::Uuid;

pub mod loggable;
pub use loggable::{Loggable, Severity};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent<T> {
    pub id: Uuid,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
    pub actor_id: Option<Uuid>,
    pub subject_id: Option<Uuid>,
    pub payload: T,
}

impl<T> DomainEvent<T> {
    pub fn new(name: String, actor_id: Option<Uuid>, subject_id: Option<Uuid>, payload: T) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            occurred_at: Utc::now(),
            actor_id,
            subject_id,
            payload,
        }
    }
}

pub type EventBus = broadcast::Sender<Value>;

pub fn init_event_bus() -> (EventBus, broadcast::Receiver<Value>) {
    broadcast::channel(1024)
}

/// Structured activity payload: the new entity state plus severity for the
/// retention policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityPayload {
    #[serde(rename = "new")]
    pub current: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old: Option<Value>,
    pub severity: Severity,
}

/// Log an activity for any entity implementing [`Loggable`]. Fire and forget:
/// logging failures never break the request that triggered them.
pub fn log_activity<T: Loggable>(
    event_bus: &EventBus,
    action: &str,
    actor_id: Option<Uuid>,
    entity: &T,
) {
    log_activity_with_old(event_bus, action, actor_id, entity, None);
}

pub fn log_activity_with_old<T: Loggable>(
    event_bus: &EventBus,
    action: &str,
    actor_id: Option<Uuid>,
    entity: &T,
    old_entity: Option<&T>,
) {
    let event_name = format!("{}.{}", T::entity_type(), action);
    let severity = entity.severity_for_action(action);

    let payload = ActivityPayload {
        current: serde_json::to_value(entity).unwrap_or_default(),
        old: old_entity.map(|e| serde_json::to_value(e).unwrap_or_default()),
        severity,
    };

    let event = DomainEvent::new(
        event_name,
        actor_id,
        Some(entity.subject_id()),
        serde_json::to_value(&payload).unwrap_or_default(),
    );

    let _ = event_bus.send(serde_json::to_value(event).unwrap_or_default());
}

fn describe(event_name: &str) -> String {
    let description = match event_name {
        "project.created" => "Project created",
        "project.updated" => "Project updated",
        "project.deleted" => "Project deleted",
        "project.submitted" => "Project submitted",
        "project.visibility_changed" => "Project visibility changed",
        "assignment.created" => "Teacher assignment proposed",
        "assignment.updated" => "Teacher assignment updated",
        "assignment.accepted" => "Teacher assignment accepted",
        "assignment.declined" => "Teacher assignment declined",
        "assignment.deleted" => "Teacher assignment removed",
        "milestone.created" => "Milestone created",
        "milestone.updated" => "Milestone updated",
        "milestone.deleted" => "Milestone deleted",
        "milestone.completion_updated" => "Milestone completion updated",
        "comment.created" => "Comment posted",
        "consultation.created" => "Consultation recorded",
        "consultation.updated" => "Consultation updated",
        "consultation.deleted" => "Consultation removed",
        "evaluation.created" => "Evaluation recorded",
        "evaluation.updated" => "Evaluation updated",
        "evaluation.deleted" => "Evaluation removed",
        "user.registered" => "New user registered",
        _ => "System event",
    };
    description.to_string()
}

/// Drains the event bus into the `activity_log` projection table.
pub async fn start_activity_listener(mut rx: broadcast::Receiver<Value>, pool: SqlitePool) {
    tracing::info!("Activity listener started");
    while let Ok(event) = rx.recv().await {
        let event_json = event.clone();

        let name = event.get("name").and_then(|v| v.as_str()).unwrap_or("unknown");
        let actor_id = event
            .get("actor_id")
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok());
        let subject_id = event
            .get("subject_id")
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok());
        let occurred_at = event
            .get("occurred_at")
            .and_then(|v| v.as_str())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);
        let severity = event
            .get("payload")
            .and_then(|p| p.get("severity"))
            .and_then(|s| s.as_str())
            .unwrap_or(Severity::Important.as_str())
            .to_string();

        let result = sqlx::query(
            "INSERT INTO activity_log (id, event_name, description, actor_id, subject_id, occurred_at, properties, severity) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(describe(name))
        .bind(actor_id)
        .bind(subject_id)
        .bind(occurred_at)
        .bind(event_json.to_string())
        .bind(severity)
        .execute(&pool)
        .await;

        if let Err(e) = result {
            tracing::error!("Failed to save activity log: {}", e);
        }
    }
}
