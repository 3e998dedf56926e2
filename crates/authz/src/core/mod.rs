//! Core storage abstraction.
//!
//! The [`TreeStore`] trait is implemented by every backend in
//! [`backends`](crate::backends) and consumed by the hierarchy components.

mod store;

pub use store::{RoleGrants, TreeStore};
pub(crate) use store::grant_owners;
