//! Visibility Resolver: computes, per actor and entity, the SQL predicate
//! that defines which rows exist in that actor's view.
//!
//! Routes interpolate the clause into both list queries and fetch-by-id
//! queries, so a record outside the caller's view produces the same not-found
//! response as a record that was never there.

use crate::models::user::Role;

use super::Actor;

/// A WHERE fragment plus the number of times the actor id must be bound into
/// it, in order, before any other parameters that follow it in the query.
#[derive(Debug, Clone)]
pub struct Scope {
    pub clause: String,
    pub actor_binds: usize,
}

impl Scope {
    fn new(clause: impl Into<String>, actor_binds: usize) -> Self {
        Self {
            clause: clause.into(),
            actor_binds,
        }
    }
}

/// Projects: admins see everything non-deleted, teachers their assigned
/// projects plus public ones, students their own plus public ones. Deleted
/// rows are invisible to every role.
pub fn projects(actor: &Actor, alias: &str) -> Scope {
    match actor.role {
        Role::Admin => Scope::new(format!("{alias}.deleted = 0"), 0),
        Role::Teacher => Scope::new(
            format!(
                "{alias}.deleted = 0 AND (EXISTS (SELECT 1 FROM project_teachers pt \
                 WHERE pt.project_id = {alias}.id AND pt.teacher_id = ?) \
                 OR {alias}.public_visibility = 1)"
            ),
            1,
        ),
        Role::Student => Scope::new(
            format!("{alias}.deleted = 0 AND ({alias}.student_id = ? OR {alias}.public_visibility = 1)"),
            1,
        ),
    }
}

/// The unauthenticated read path: public and non-deleted, nothing else.
pub fn public_projects(alias: &str) -> Scope {
    Scope::new(
        format!("{alias}.deleted = 0 AND {alias}.public_visibility = 1"),
        0,
    )
}

pub fn assignments(actor: &Actor, alias: &str) -> Scope {
    match actor.role {
        Role::Admin => Scope::new("1 = 1", 0),
        Role::Teacher => Scope::new(format!("{alias}.teacher_id = ?"), 1),
        Role::Student => Scope::new(
            format!(
                "EXISTS (SELECT 1 FROM projects p WHERE p.id = {alias}.project_id \
                 AND p.student_id = ?)"
            ),
            1,
        ),
    }
}

pub fn milestones(actor: &Actor, alias: &str) -> Scope {
    match actor.role {
        Role::Admin => Scope::new("1 = 1", 0),
        Role::Teacher => Scope::new(assigned_project_clause(alias), 1),
        Role::Student => Scope::new(owned_project_clause(alias), 1),
    }
}

/// Comments follow project visibility minus the public-inclusion clause:
/// being able to browse a public project does not expose its discussion
/// thread.
pub fn comments(actor: &Actor, alias: &str) -> Scope {
    match actor.role {
        Role::Admin => Scope::new("1 = 1", 0),
        Role::Teacher => Scope::new(
            format!(
                "EXISTS (SELECT 1 FROM project_teachers pt JOIN projects p ON p.id = pt.project_id \
                 WHERE pt.project_id = {alias}.project_id AND pt.teacher_id = ? AND p.deleted = 0)"
            ),
            1,
        ),
        Role::Student => Scope::new(
            format!(
                "EXISTS (SELECT 1 FROM projects p WHERE p.id = {alias}.project_id \
                 AND p.student_id = ? AND p.deleted = 0)"
            ),
            1,
        ),
    }
}

/// Consultations and evaluations: teachers additionally see records naming
/// them directly, even without a current assignment (union, not
/// intersection).
pub fn consultations(actor: &Actor, alias: &str) -> Scope {
    teacher_union(actor, alias)
}

pub fn evaluations(actor: &Actor, alias: &str) -> Scope {
    teacher_union(actor, alias)
}

fn teacher_union(actor: &Actor, alias: &str) -> Scope {
    match actor.role {
        Role::Admin => Scope::new("1 = 1", 0),
        Role::Teacher => Scope::new(
            format!("({alias}.teacher_id = ? OR {})", assigned_project_clause(alias)),
            2,
        ),
        Role::Student => Scope::new(owned_project_clause(alias), 1),
    }
}

fn assigned_project_clause(alias: &str) -> String {
    format!(
        "EXISTS (SELECT 1 FROM project_teachers pt WHERE pt.project_id = {alias}.project_id \
         AND pt.teacher_id = ?)"
    )
}

fn owned_project_clause(alias: &str) -> String {
    format!(
        "EXISTS (SELECT 1 FROM projects p WHERE p.id = {alias}.project_id AND p.student_id = ?)"
    )
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn actor(role: Role) -> Actor {
        Actor::new(Uuid::new_v4(), role)
    }

    #[test]
    fn admin_project_scope_only_filters_deleted() {
        let scope = projects(&actor(Role::Admin), "p");
        assert_eq!(scope.clause, "p.deleted = 0");
        assert_eq!(scope.actor_binds, 0);
    }

    #[test]
    fn student_project_scope_includes_ownership_and_public() {
        let scope = projects(&actor(Role::Student), "p");
        assert!(scope.clause.contains("p.student_id = ?"));
        assert!(scope.clause.contains("p.public_visibility = 1"));
        assert!(scope.clause.contains("p.deleted = 0"));
        assert_eq!(scope.actor_binds, 1);
    }

    #[test]
    fn teacher_project_scope_includes_assignment_and_public() {
        let scope = projects(&actor(Role::Teacher), "p");
        assert!(scope.clause.contains("project_teachers"));
        assert!(scope.clause.contains("p.public_visibility = 1"));
        assert_eq!(scope.actor_binds, 1);
    }

    #[test]
    fn public_scope_never_binds_an_actor() {
        let scope = public_projects("p");
        assert_eq!(
            scope.clause,
            "p.deleted = 0 AND p.public_visibility = 1"
        );
        assert_eq!(scope.actor_binds, 0);
    }

    #[test]
    fn comment_scope_has_no_public_inclusion() {
        for role in [Role::Student, Role::Teacher] {
            let scope = comments(&actor(role), "c");
            assert!(!scope.clause.contains("public_visibility"));
            assert_eq!(scope.actor_binds, 1);
        }
    }

    #[test]
    fn teacher_consultation_scope_unions_direct_and_assigned() {
        let scope = consultations(&actor(Role::Teacher), "c");
        assert!(scope.clause.contains("c.teacher_id = ?"));
        assert!(scope.clause.contains("project_teachers"));
        assert_eq!(scope.actor_binds, 2);
    }

    #[test]
    fn teacher_assignment_scope_is_self_only() {
        let scope = assignments(&actor(Role::Teacher), "a");
        assert_eq!(scope.clause, "a.teacher_id = ?");
        assert_eq!(scope.actor_binds, 1);
    }
}
