//! The chat orchestration core.
//!
//! One inbound message flows through: session resolution, the history
//! window, prompt composition, the provider call, reply classification,
//! and best-effort persistence.

pub mod classify;
pub mod history;
pub mod prompt;
pub mod repository;
pub mod service;
pub mod session;
