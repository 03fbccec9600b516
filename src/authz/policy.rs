//! Authorization Engine: allow/deny decisions for mutating and custom
//! actions. Read access is not decided here; the Visibility Resolver already
//! scopes what a read can return.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::user::Role;

use super::Actor;

/// Lookups the engine needs from the record store. Kept behind a trait so the
/// decision logic can be exercised against a fake in unit tests.
#[async_trait]
pub trait AccessStore: Send + Sync {
    async fn is_teacher_assigned(&self, teacher_id: Uuid, project_id: Uuid) -> AppResult<bool>;

    /// `Ok(None)` when the project does not exist at all; `Ok(Some(owner))`
    /// otherwise, where the owner itself may be gone (`None`).
    async fn project_owner(&self, project_id: Uuid) -> AppResult<Option<Option<Uuid>>>;
}

#[async_trait]
impl AccessStore for SqlitePool {
    async fn is_teacher_assigned(&self, teacher_id: Uuid, project_id: Uuid) -> AppResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM project_teachers WHERE project_id = ? AND teacher_id = ?",
        )
        .bind(project_id)
        .bind(teacher_id)
        .fetch_one(self)
        .await?;

        Ok(count > 0)
    }

    async fn project_owner(&self, project_id: Uuid) -> AppResult<Option<Option<Uuid>>> {
        let owner: Option<Option<Uuid>> =
            sqlx::query_scalar("SELECT student_id FROM projects WHERE id = ?")
                .bind(project_id)
                .fetch_optional(self)
                .await?;

        Ok(owner)
    }
}

/// Project creation is open to every role in the current model; the gate
/// exists so the decision stays in one place if a read-only role is added.
pub fn ensure_can_create_project(actor: &Actor) -> AppResult<()> {
    match actor.role {
        Role::Student | Role::Teacher | Role::Admin => Ok(()),
    }
}

/// Update, soft delete and submit share one rule: the owning student, a
/// teacher assigned to the project, or an admin.
pub async fn ensure_can_modify_project(
    actor: &Actor,
    project_id: Uuid,
    owner: Option<Uuid>,
    store: &impl AccessStore,
) -> AppResult<()> {
    if actor.is_admin() {
        return Ok(());
    }

    match actor.role {
        Role::Student if owner == Some(actor.id) => Ok(()),
        Role::Teacher if store.is_teacher_assigned(actor.id, project_id).await? => Ok(()),
        _ => Err(AppError::forbidden("not allowed to modify this project")),
    }
}

/// Visibility flips are reserved for assigned teachers and admins; the owning
/// student is deliberately excluded.
pub async fn ensure_can_set_visibility(
    actor: &Actor,
    project_id: Uuid,
    store: &impl AccessStore,
) -> AppResult<()> {
    if actor.is_admin() {
        return Ok(());
    }

    if actor.is_teacher() && store.is_teacher_assigned(actor.id, project_id).await? {
        return Ok(());
    }

    Err(AppError::forbidden(
        "only project teachers or administrators can change project visibility",
    ))
}

/// Assignment creation: admins unconditionally, teachers unconditionally
/// (volunteering), students only for a project they own. A missing project
/// denies a student rather than deferring.
pub async fn ensure_can_create_assignment(
    actor: &Actor,
    project_id: Uuid,
    store: &impl AccessStore,
) -> AppResult<()> {
    match actor.role {
        Role::Admin | Role::Teacher => Ok(()),
        Role::Student => match store.project_owner(project_id).await? {
            Some(Some(owner)) if owner == actor.id => Ok(()),
            _ => Err(AppError::forbidden(
                "students may only assign teachers to their own projects",
            )),
        },
    }
}

/// Update/delete on an existing assignment: admins, the owning student of the
/// assignment's project, or the named teacher.
pub async fn ensure_can_modify_assignment(
    actor: &Actor,
    assignment_teacher: Uuid,
    project_id: Uuid,
    store: &impl AccessStore,
) -> AppResult<()> {
    if actor.is_admin() {
        return Ok(());
    }

    match actor.role {
        Role::Teacher if assignment_teacher == actor.id => Ok(()),
        Role::Student => match store.project_owner(project_id).await? {
            Some(Some(owner)) if owner == actor.id => Ok(()),
            _ => Err(AppError::forbidden("not allowed to modify this assignment")),
        },
        _ => Err(AppError::forbidden("not allowed to modify this assignment")),
    }
}

/// Accept and decline belong to the named teacher alone; not even admins may
/// answer on a teacher's behalf.
pub fn ensure_named_teacher(actor: &Actor, assignment_teacher: Uuid) -> AppResult<()> {
    if actor.id == assignment_teacher {
        Ok(())
    } else {
        Err(AppError::forbidden(
            "only the assigned teacher can respond to this assignment",
        ))
    }
}

/// Writes on supervision records (milestones, consultations, evaluations):
/// a teacher assigned to the project, or an admin.
pub async fn ensure_supervision_write(
    actor: &Actor,
    project_id: Uuid,
    store: &impl AccessStore,
) -> AppResult<()> {
    if actor.is_admin() {
        return Ok(());
    }

    if actor.is_teacher() && store.is_teacher_assigned(actor.id, project_id).await? {
        return Ok(());
    }

    Err(AppError::forbidden(
        "only teachers assigned to the project can do this",
    ))
}

/// Milestone completion may also be reported by the owning student.
pub async fn ensure_can_update_completion(
    actor: &Actor,
    project_id: Uuid,
    owner: Option<Uuid>,
    store: &impl AccessStore,
) -> AppResult<()> {
    if actor.is_admin() {
        return Ok(());
    }

    match actor.role {
        Role::Student if owner == Some(actor.id) => Ok(()),
        Role::Teacher if store.is_teacher_assigned(actor.id, project_id).await? => Ok(()),
        _ => Err(AppError::forbidden("not allowed to update this milestone")),
    }
}
