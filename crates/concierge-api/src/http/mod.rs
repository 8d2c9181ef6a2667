//! HTTP layer: router, handlers, and error mapping.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod router;
