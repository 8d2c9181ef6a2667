//! REST API request handlers.

pub mod chat;
pub mod feedback;
pub mod history;
