//! Tree semantics on top of a [`TreeStore`](crate::core::TreeStore).
//!
//! - [`TreeNavigator`] - Children, descendants and ancestor chains
//! - [`CycleGuard`] - Descendant checks that keep the trees acyclic
//! - [`PermissionResolver`] - Direct and inherited permissions of a role
//! - [`HierarchyManager`] - Validated single and batch writes
//!
//! Readers only ever see committed state. Writers are serialized per tree
//! scope through [`TreeLocks`]: the organization tree is one scope, and each
//! tenant's role tree (plus the global role tree) is another.

mod closure;
mod guard;
mod locks;
mod manager;
mod navigator;
mod resolver;

pub use closure::{SubtreeClosure, ancestor_chain};
pub use guard::CycleGuard;
pub use locks::{LockScope, TreeGuard, TreeLocks};
pub use manager::HierarchyManager;
pub use navigator::TreeNavigator;
pub use resolver::PermissionResolver;
