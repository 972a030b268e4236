//! shunt-core - Routing resolution for the shunt gateway
//!
//! This crate provides:
//! - The routing resolver that decides which provider/model pair serves a request
//! - Prompt rule evaluation: case-insensitive regex search, first match wins
//! - File routing by lower-cased extension
//! - Typed routing errors shared with the HTTP surface

pub mod error;
pub mod resolver;
pub mod types;

// Re-export main types for convenience
pub use error::RouteError;
pub use resolver::{file_extension, RouteResolver};
pub use types::{ChatResolution, FileResolution};
