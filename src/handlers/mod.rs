//! HTTP layer: session cookie plumbing, request extractors, and the
//! handlers behind each route.

pub mod auth_handlers;
pub mod health_handlers;
pub mod object_handlers;
pub mod session;
