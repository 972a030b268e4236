//! HTTP gateway for shunt
//!
//! This crate provides:
//! - The Axum server exposing chat completion and file upload routing
//! - Admin endpoints for appending and listing routing rules
//! - Embedded home and admin pages

pub mod pages;
pub mod protocol;
pub mod server;

// Re-export main types
pub use server::{GatewayServer, GatewayState};
