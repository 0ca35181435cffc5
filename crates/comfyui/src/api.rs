//! REST API client for the ComfyUI HTTP endpoints.
//!
//! Wraps workflow submission over the ComfyUI HTTP API using
//! [`reqwest`]. Response parsing is deliberately loose: different
//! server builds report the queued job id under different key names,
//! so the raw JSON is kept and the id extracted tolerantly.

use serde_json::Value;

/// Response keys a queued-job id has been observed under, in lookup
/// order. Older builds report `number` only.
const JOB_ID_KEYS: &[&str] = &["prompt_id", "promptId", "number"];

/// HTTP client for a single ComfyUI instance.
pub struct ComfyUIApi {
    client: reqwest::Client,
    api_url: String,
}

/// Errors from the ComfyUI REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum ComfyUIApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// ComfyUI returned a non-2xx status code.
    #[error("ComfyUI API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl ComfyUIApi {
    /// Create a new API client for a ComfyUI instance.
    ///
    /// * `api_url` - Base HTTP URL, e.g. `http://host:8188`.
    pub fn new(api_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
        }
    }

    /// Create an API client reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling).
    pub fn with_client(client: reqwest::Client, api_url: String) -> Self {
        Self { client, api_url }
    }

    /// Submit a workflow for execution.
    ///
    /// Sends a `POST /prompt` request with the given workflow JSON and
    /// client ID. Returns the raw acceptance body; use
    /// [`extract_job_id`] to read the queued-job id from it.
    pub async fn submit_workflow(
        &self,
        workflow: &Value,
        client_id: &str,
    ) -> Result<Value, ComfyUIApiError> {
        let body = serde_json::json!({
            "prompt": workflow,
            "client_id": client_id,
        });

        let response = self
            .client
            .post(format!("{}/prompt", self.api_url))
            .json(&body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`ComfyUIApiError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ComfyUIApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ComfyUIApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ComfyUIApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

/// Pull the queued-job id out of an acceptance body, whatever key and
/// JSON type the server used for it.
///
/// Returns `None` when no known key carries a usable value; acceptance
/// itself is still valid in that case.
pub fn extract_job_id(body: &Value) -> Option<String> {
    for key in JOB_ID_KEYS {
        match body.get(*key) {
            Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // -- extract_job_id --

    #[test]
    fn reads_snake_case_prompt_id() {
        let body = json!({"prompt_id": "abc-123", "number": 4});
        assert_eq!(extract_job_id(&body).as_deref(), Some("abc-123"));
    }

    #[test]
    fn reads_camel_case_prompt_id() {
        let body = json!({"promptId": "xyz-9"});
        assert_eq!(extract_job_id(&body).as_deref(), Some("xyz-9"));
    }

    #[test]
    fn falls_back_to_queue_number() {
        let body = json!({"number": 17});
        assert_eq!(extract_job_id(&body).as_deref(), Some("17"));
    }

    #[test]
    fn numeric_prompt_id_is_stringified() {
        let body = json!({"prompt_id": 42});
        assert_eq!(extract_job_id(&body).as_deref(), Some("42"));
    }

    #[test]
    fn empty_string_id_is_skipped() {
        let body = json!({"prompt_id": "", "number": 3});
        assert_eq!(extract_job_id(&body).as_deref(), Some("3"));
    }

    #[test]
    fn missing_id_returns_none() {
        let body = json!({"node_errors": {}});
        assert_eq!(extract_job_id(&body), None);
    }
}
