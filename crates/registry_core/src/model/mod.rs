//! Domain model for the resident registry.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Expose the fixed resident attribute set for name-based lookup.
//!
//! # Invariants
//! - Every resident is identified by a caller-provided, immutable `id`.
//! - Every user is identified by a generated `UserId`.

pub mod resident;
pub mod user;
