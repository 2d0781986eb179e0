//! Sens Core Library
//!
//! Transport-independent pieces of the Sens document-intelligence client:
//! - Wire models for documents, queries and context rails
//! - The eight-kind error taxonomy
//! - Client configuration and API key resolution

pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::ClientConfig;
pub use error::{ErrorDetail, ErrorKind, RateLimitInfo, Result, SensError};
pub use models::*;
