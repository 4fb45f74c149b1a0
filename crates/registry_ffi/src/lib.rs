//! Flutter-facing bindings for the resident registry core.

pub mod api;
mod session;
