//! Chat orchestration logic and trait definitions for Concierge.
//!
//! This crate defines the "ports" (repository and provider traits) that the
//! infrastructure layer implements. It depends only on `concierge-types` --
//! never on `concierge-infra` or any database/HTTP crate.

pub mod chat;
pub mod llm;
pub mod ratelimit;
