//! Authorization and visibility core.
//!
//! Every request resolves in two steps: `visibility` narrows queries to the
//! records the actor may see at all, then `policy` gates the specific action
//! on a record inside that set. Both operate on an explicit [`Actor`]; there
//! is no ambient identity.

mod actor;
pub mod policy;
pub mod visibility;

pub use actor::Actor;
pub use policy::AccessStore;
pub use visibility::Scope;
