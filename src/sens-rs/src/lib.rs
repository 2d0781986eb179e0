//! Sens Client Library
//!
//! HTTP client for the Sens document-intelligence REST API: upload
//! documents, poll their status, query them, and fetch the context rail
//! behind an answer.
//!
//! ```rust,no_run
//! use sens_rs::{Client, ClientConfig, QueryOptions};
//!
//! # async fn run() -> sens_rs::Result<()> {
//! let client = Client::new(ClientConfig::new("sens_sk_..."))?;
//! let result = client
//!     .query("What are the key findings?", QueryOptions::new().document_ids(["doc_abc123"]))
//!     .await?;
//! println!("{}", result.answer);
//! # Ok(())
//! # }
//! ```

mod client;
pub mod errors;
pub mod transport;

pub use client::Client;
pub use sens_core::config::{API_KEY_ENV, DEFAULT_BASE_URL};
pub use sens_core::error::VALIDATION_CODE;
pub use sens_core::{
    ClientConfig, ContextRail, ContextRailSummary, Document, DocumentStatus, ErrorDetail,
    ErrorKind, QueryOptions, QueryResult, RateLimitInfo, Result, SemanticLayer, SensError,
    Source, UploadOptions,
};
pub use transport::{HttpTransport, Transport};
