//! Role-based access gate for registry operations.
//!
//! # Invariants
//! - Permissions are deny-by-default: a role holds only what it lists.

pub mod permission;

pub use permission::{ensure, parse_permission, AccessError, Permission};
