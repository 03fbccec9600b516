pub mod assignments;
pub mod auth;
pub mod comments;
pub mod consultations;
pub mod evaluations;
pub mod health;
pub mod milestones;
pub mod projects;
pub mod users;
