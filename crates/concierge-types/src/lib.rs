//! Shared domain types for Concierge.
//!
//! This crate holds the data shapes exchanged between the orchestration
//! core, the persistence layer, and the HTTP surface. It carries no
//! business logic and no I/O.

pub mod config;
pub mod error;
pub mod llm;
pub mod turn;
