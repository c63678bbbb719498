//! Routing of decoded client messages to typed handlers.

pub mod error;
pub(crate) mod handlers;
pub(crate) mod registry;

pub(crate) use handlers::build_registry;
