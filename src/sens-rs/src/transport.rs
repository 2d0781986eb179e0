use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, Url};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use sens_core::{ClientConfig, Result, SensError};

pub const USER_AGENT: &str = concat!("sens-rs/", env!("CARGO_PKG_VERSION"));

/// Transport performs one HTTP exchange and hands back the raw response.
///
/// Any status, including errors, is a successful exchange here; status
/// mapping happens above this layer.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse>;
}

#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Multipart(UploadForm),
}

/// Multipart upload: the file is opened and streamed by the transport
#[derive(Debug, Clone, PartialEq)]
pub struct UploadForm {
    pub file_path: PathBuf,
    pub fields: Vec<(&'static str, String)>,
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path segments appended to the base URL, unencoded
    pub segments: Vec<String>,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: Method, segments: &[&str]) -> Self {
        Self {
            method,
            segments: segments.iter().map(|s| s.to_string()).collect(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(segments: &[&str]) -> Self {
        Self::new(Method::GET, segments)
    }

    pub fn delete(segments: &[&str]) -> Self {
        Self::new(Method::DELETE, segments)
    }

    pub fn post_json(segments: &[&str], body: serde_json::Value) -> Self {
        Self {
            body: RequestBody::Json(body),
            ..Self::new(Method::POST, segments)
        }
    }

    pub fn post_multipart(segments: &[&str], form: UploadForm) -> Self {
        Self {
            body: RequestBody::Multipart(form),
            ..Self::new(Method::POST, segments)
        }
    }

    /// `/documents/doc_1` style rendering for logs
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// reqwest-backed transport with bearer auth and a per-request timeout
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig, api_key: String) -> Result<Self> {
        let base_url = parse_base_url(&config.normalized_base_url()?)?;
        let timeout = config.timeout();
        if timeout.is_zero() {
            return Err(SensError::local_validation("timeout must be greater than zero"));
        }

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| SensError::generic("failed to build HTTP client", e))?;

        Ok(Self {
            client,
            base_url,
            api_key,
            timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, segments: &[String]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SensError::local_validation(format!("base URL cannot carry a path: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn transport_error(&self, request: &ApiRequest, err: reqwest::Error) -> SensError {
        let message = if err.is_timeout() {
            format!(
                "{} {} timed out after {}ms",
                request.method,
                request.path(),
                self.timeout.as_millis()
            )
        } else if err.is_connect() {
            format!("{} {} could not connect", request.method, request.path())
        } else {
            format!("{} {} failed", request.method, request.path())
        };
        SensError::generic(message, err)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse> {
        let url = self.url(&request.segments)?;
        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .bearer_auth(&self.api_key);

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(form) => builder.multipart(build_form(form).await?),
        };

        let started = Instant::now();
        let response = builder
            .send()
            .await
            .map_err(|e| self.transport_error(&request, e))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(&request, e))?
            .to_vec();

        tracing::debug!(
            method = %request.method,
            path = %request.path(),
            status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "sens request completed"
        );

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| SensError::local_validation(format!("invalid base URL {}: {}", raw, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(SensError::local_validation(format!(
            "base URL must use http or https: {}",
            raw
        )));
    }
    if url.cannot_be_a_base() {
        return Err(SensError::local_validation(format!(
            "base URL cannot carry a path: {}",
            raw
        )));
    }
    Ok(url)
}

/// Stream the file as the `file` part; text fields go first
async fn build_form(upload: &UploadForm) -> Result<Form> {
    let path = &upload.file_path;
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| SensError::generic(format!("failed to open {}", path.display()), e))?;
    let length = file
        .metadata()
        .await
        .map_err(|e| SensError::generic(format!("failed to stat {}", path.display()), e))?
        .len();

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());

    let mut form = Form::new();
    for (name, value) in &upload.fields {
        form = form.text(*name, value.clone());
    }

    let part = Part::stream_with_length(reqwest::Body::from(file), length).file_name(file_name);
    Ok(form.part("file", part))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sens_core::ErrorKind;

    fn transport(base_url: &str) -> Result<HttpTransport> {
        let config = ClientConfig::new("sens_sk_test").with_base_url(base_url);
        HttpTransport::new(&config, "sens_sk_test".to_string())
    }

    #[test]
    fn test_url_appends_segments_to_base_path() {
        let t = transport("https://api.sens.ai/v1/").unwrap();
        let url = t.url(&["documents".to_string(), "doc_1".to_string()]).unwrap();
        assert_eq!(url.as_str(), "https://api.sens.ai/v1/documents/doc_1");
    }

    #[test]
    fn test_url_on_bare_host() {
        let t = transport("http://127.0.0.1:9000").unwrap();
        let url = t.url(&["query".to_string()]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/query");
    }

    #[test]
    fn test_url_encodes_opaque_ids() {
        let t = transport("https://api.sens.ai/v1").unwrap();
        let url = t.url(&["documents".to_string(), "a/b c".to_string()]).unwrap();
        assert_eq!(url.path(), "/v1/documents/a%2Fb%20c");
    }

    #[test]
    fn test_rejects_bad_base_urls() {
        for raw in ["not a url", "ftp://files.example.com", "mailto:ops@example.com"] {
            let err = transport(raw).err().expect(raw);
            assert_eq!(err.kind(), ErrorKind::Validation, "{}", raw);
        }
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let config = ClientConfig::new("sens_sk_test").with_timeout(Duration::from_millis(0));
        let err = HttpTransport::new(&config, "sens_sk_test".to_string())
            .err()
            .expect("zero timeout accepted");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.message().contains("timeout"));
    }

    #[test]
    fn test_request_path_rendering() {
        let request = ApiRequest::get(&["context-rail", "qry_1"]);
        assert_eq!(request.path(), "/context-rail/qry_1");
        assert_eq!(request.method, Method::GET);
    }

    #[test]
    fn test_success_range() {
        let response = |status| RawResponse {
            status,
            headers: HeaderMap::new(),
            body: Vec::new(),
        };
        assert!(response(200).is_success());
        assert!(response(204).is_success());
        assert!(!response(301).is_success());
        assert!(!response(404).is_success());
    }
}
