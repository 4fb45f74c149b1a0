//! Display-ready list views over an in-memory record snapshot.
//!
//! # Responsibility
//! - Own the client-side snapshot of records fetched from storage.
//! - Derive filtered, sorted and limited views without touching the snapshot.
//!
//! # Invariants
//! - View computation is pure and never reorders or mutates the snapshot.
//! - No two records in a snapshot share an id.

pub mod engine;
pub mod record;

pub use engine::{compute_view, ViewEngine, ViewLimit, ViewQuery};
pub use record::{AttributeSource, MatchMode, Record};
