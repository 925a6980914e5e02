//! Switchyard Core Types and Traits
//!
//! This crate provides the fundamental types and traits used throughout Switchyard:
//! - Unified chat request/response schema
//! - The `ChatClient` trait implemented by provider clients
//! - Core error types and error codes

pub mod chat;
pub mod error;
pub mod provider;
pub mod retry_after;

pub use error::{Error, ErrorCode, Result};
pub use provider::{ChatClient, ChatStream};
pub use retry_after::parse_retry_after;
