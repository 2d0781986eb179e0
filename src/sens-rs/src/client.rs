use std::path::Path;
use std::sync::Arc;

use sens_core::{
    ClientConfig, ContextRail, Document, QueryOptions, QueryRequest, QueryResult, Result,
    SensError, UploadOptions,
};

use crate::errors::{decode, expect_success};
use crate::transport::{ApiRequest, HttpTransport, Transport, UploadForm};

/// Sens REST API Client
///
/// Holds only immutable configuration, so one instance can be cloned and
/// shared across tasks. Every call is exactly one HTTP exchange; nothing is
/// retried.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
}

impl Client {
    /// Create a client; a missing `api_key` falls back to `SENS_API_KEY`
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_key_lookup(config, |name| std::env::var(name).ok())
    }

    /// Create a client with default settings and the API key from `SENS_API_KEY`
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::default())
    }

    /// Create a client, resolving the fallback key through `lookup` (called at most once)
    pub fn with_key_lookup<F>(config: ClientConfig, lookup: F) -> Result<Self>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        let api_key = config.resolve_api_key(lookup)?;
        let transport = HttpTransport::new(&config, api_key)?;
        tracing::debug!(
            base_url = %transport.base_url(),
            timeout_ms = config.timeout_ms,
            "sens client initialized"
        );
        Ok(Self::with_transport(Arc::new(transport)))
    }

    /// Create a client on top of a custom transport
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Upload a document for processing.
    ///
    /// The local path is checked before anything is sent; the returned
    /// document is usually still `processing`.
    #[tracing::instrument(skip_all, fields(path = %file_path.as_ref().display()))]
    pub async fn upload_document(
        &self,
        file_path: impl AsRef<Path>,
        options: UploadOptions,
    ) -> Result<Document> {
        let path = file_path.as_ref();
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                return Err(SensError::local_validation(format!(
                    "Not a regular file: {}",
                    path.display()
                )))
            }
            Err(_) => {
                return Err(SensError::local_validation(format!(
                    "File not found: {}",
                    path.display()
                )))
            }
        }

        let form = UploadForm {
            file_path: path.to_path_buf(),
            fields: options.form_fields(),
        };
        let response = self
            .transport
            .send(ApiRequest::post_multipart(&["documents"], form))
            .await?;

        let doc: Document = decode(response)?;
        tracing::info!(document_id = %doc.id, status = %doc.status, "document uploaded");
        Ok(doc)
    }

    /// Get the current snapshot of a document
    #[tracing::instrument(skip_all, fields(id = id.as_ref()))]
    pub async fn get_document(&self, id: impl AsRef<str>) -> Result<Document> {
        let response = self
            .transport
            .send(ApiRequest::get(&["documents", id.as_ref()]))
            .await?;
        decode(response)
    }

    /// Delete a document permanently.
    ///
    /// Not idempotent: deleting an id twice yields a not-found error.
    #[tracing::instrument(skip_all, fields(id = id.as_ref()))]
    pub async fn delete_document(&self, id: impl AsRef<str>) -> Result<()> {
        let response = self
            .transport
            .send(ApiRequest::delete(&["documents", id.as_ref()]))
            .await?;
        expect_success(response)?;
        tracing::info!("document deleted");
        Ok(())
    }

    /// Ask a natural-language question.
    ///
    /// `limit` and `confidence_threshold` are always sent, defaults included.
    #[tracing::instrument(skip_all, fields(query_len = query.len(), limit = options.limit))]
    pub async fn query(&self, query: &str, options: QueryOptions) -> Result<QueryResult> {
        let body = serde_json::to_value(QueryRequest::new(query, &options))
            .map_err(|e| SensError::generic("failed to encode query", e))?;

        let response = self
            .transport
            .send(ApiRequest::post_json(&["query"], body))
            .await?;

        let result: QueryResult = decode(response)?;
        tracing::debug!(
            query_id = %result.query_id,
            sources = result.sources.len(),
            "query answered"
        );
        Ok(result)
    }

    /// Fetch the detailed provenance for an earlier query
    #[tracing::instrument(skip_all, fields(query_id = query_id.as_ref()))]
    pub async fn get_context_rail(&self, query_id: impl AsRef<str>) -> Result<ContextRail> {
        let response = self
            .transport
            .send(ApiRequest::get(&["context-rail", query_id.as_ref()]))
            .await?;

        let rail: ContextRail = decode(response)?;
        if !rail.summary.is_consistent() {
            tracing::warn!(
                chunks_returned = ?rail.summary.chunks_returned,
                total_chunks_evaluated = ?rail.summary.total_chunks_evaluated,
                "context rail summary returns more chunks than it evaluated"
            );
        }
        Ok(rail)
    }
}
