//! Rule persistence layer for shunt
//!
//! This crate provides:
//! - SQLite storage for known models, prompt routing rules, and file routing rules
//! - Insertion-ordered rule listings consumed by the routing resolver
//! - Idempotent seeding of the default model catalog

pub mod db;

// Re-export main types
pub use db::{FileRule, ModelEntry, PromptRule, RuleDb, StoreStats};
