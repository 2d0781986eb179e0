use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Number of sources requested when the caller does not choose a limit
pub const DEFAULT_QUERY_LIMIT: u32 = 3;

/// Minimum source confidence requested when the caller does not choose one
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// DocumentStatus is the server-side processing state of an uploaded document.
///
/// Transitions are one-way: `processing` becomes either `ready` or `failed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Processing,
    Ready,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Processing => "processing",
            DocumentStatus::Ready => "ready",
            DocumentStatus::Failed => "failed",
        }
    }

    /// True once the server will no longer change this status
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DocumentStatus::Processing)
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Document represents an uploaded file and its processing state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub status: DocumentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_ready_at: Option<String>, // Only on upload responses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept_count: Option<u64>,
}

/// Parse a wire timestamp (RFC 3339, any offset) into UTC
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

// Timestamps stay as the server sent them; these parse on demand
impl Document {
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }

    pub fn estimated_ready_at_utc(&self) -> Option<DateTime<Utc>> {
        self.estimated_ready_at.as_deref().and_then(parse_timestamp)
    }

    pub fn ready_at_utc(&self) -> Option<DateTime<Utc>> {
        self.ready_at.as_deref().and_then(parse_timestamp)
    }
}

/// SemanticLayer tags what kind of meaning a source excerpt represents.
///
/// Values the client does not recognize are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SemanticLayer {
    Chunk,
    Concept,
    Context,
    Pragmatic,
    Universal,
    Other(String),
}

impl SemanticLayer {
    pub fn as_str(&self) -> &str {
        match self {
            SemanticLayer::Chunk => "chunk",
            SemanticLayer::Concept => "concept",
            SemanticLayer::Context => "context",
            SemanticLayer::Pragmatic => "pragmatic",
            SemanticLayer::Universal => "universal",
            SemanticLayer::Other(s) => s,
        }
    }
}

impl From<String> for SemanticLayer {
    fn from(s: String) -> Self {
        match s.as_str() {
            "chunk" => SemanticLayer::Chunk,
            "concept" => SemanticLayer::Concept,
            "context" => SemanticLayer::Context,
            "pragmatic" => SemanticLayer::Pragmatic,
            "universal" => SemanticLayer::Universal,
            _ => SemanticLayer::Other(s),
        }
    }
}

impl From<SemanticLayer> for String {
    fn from(layer: SemanticLayer) -> Self {
        match layer {
            SemanticLayer::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for SemanticLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source is one excerpt backing a query answer.
///
/// Query responses carry the summary form (document, page, confidence);
/// context rails fill in excerpt, layer, concepts and insights as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub document_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_layer: Option<SemanticLayer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_concepts: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pragmatic_insights: Option<Vec<String>>,
}

/// QueryResult is the answer to one natural-language query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub query_id: String,
    pub query: String,
    pub answer: String,
    pub confidence_score: f64,
    pub processing_time_ms: u64,
    /// Server relevance order, never re-sorted
    #[serde(default)]
    pub sources: Vec<Source>,
}

impl QueryResult {
    pub fn processing_time(&self) -> Duration {
        Duration::from_millis(self.processing_time_ms)
    }
}

/// ContextRail is the full provenance snapshot for an earlier query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextRail {
    pub query_id: String,
    pub query: String,
    /// Kept as sent; see [`ContextRail::retrieved_at_utc`]
    pub retrieved_at: String,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub summary: ContextRailSummary,
}

impl ContextRail {
    pub fn retrieved_at_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.retrieved_at)
    }
}

/// ContextRailSummary aggregates the retrieval behind a context rail
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextRailSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_chunks_evaluated: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunks_returned: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_confidence: Option<f64>,
    /// Summary keys this client has no field for
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ContextRailSummary {
    /// Returned chunks never exceed evaluated chunks when both are reported
    pub fn is_consistent(&self) -> bool {
        match (self.chunks_returned, self.total_chunks_evaluated) {
            (Some(returned), Some(total)) => returned <= total,
            _ => true,
        }
    }
}

/// QueryOptions are the caller-facing knobs for a query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    pub document_ids: Vec<String>,
    pub tags: Vec<String>,
    pub limit: u32,
    pub confidence_threshold: f64,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            document_ids: Vec::new(),
            tags: Vec::new(),
            limit: DEFAULT_QUERY_LIMIT,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the query to these documents
    pub fn document_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.document_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict the query to documents carrying these tags
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }
}

/// QueryRequest is the wire body of `POST /query`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    pub limit: u32,
    pub confidence_threshold: f64,
}

impl QueryRequest {
    /// Build the wire body; empty filters are omitted, limits always sent
    pub fn new(query: impl Into<String>, options: &QueryOptions) -> Self {
        let non_empty = |v: &Vec<String>| (!v.is_empty()).then(|| v.clone());
        Self {
            query: query.into(),
            document_ids: non_empty(&options.document_ids),
            tags: non_empty(&options.tags),
            limit: options.limit,
            confidence_threshold: options.confidence_threshold,
        }
    }
}

/// UploadOptions are the optional form fields sent with a document upload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOptions {
    pub title: Option<String>,
    pub tags: Vec<String>,
}

impl UploadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Text fields for the multipart form.
    ///
    /// Tags travel as one comma-joined value; embedded commas are not escaped.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        if let Some(title) = self.title.as_ref().filter(|t| !t.is_empty()) {
            fields.push(("title", title.clone()));
        }
        if !self.tags.is_empty() {
            fields.push(("tags", self.tags.join(",")));
        }
        fields
    }
}

/// ErrorBody is the JSON body the service returns alongside error statuses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}
