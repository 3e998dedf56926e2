//! Test infrastructure for the authorization core.
//!
//! Provides the [`backend_test!`] macro, which runs one test body against
//! every available store, plus fixtures and assertion helpers.

#![allow(dead_code, unused_macros, unused_imports)]

#[macro_use]
pub mod harness;
#[macro_use]
pub mod assertions;
pub mod fixtures;

pub use assertions::*;
pub use fixtures::*;
pub use harness::*;
