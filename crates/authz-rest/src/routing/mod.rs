//! Route configuration for the authorization API.
//!
//! This module contains the routing configuration that maps HTTP paths
//! to handlers.

pub mod authz_routes;

pub use authz_routes::create_routes;
