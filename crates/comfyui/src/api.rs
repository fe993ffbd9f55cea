//! REST API client for the ComfyUI HTTP endpoints.
//!
//! Wraps the ComfyUI HTTP API (prompt submission, history retrieval,
//! image upload, reachability) using [`reqwest`]. Each call is
//! independent: no retries, and failures are reported once.

use serde::{Deserialize, Serialize};

use imgflow_core::workflow::{Connection, WorkflowNode};

use crate::config::ComfyUIConfig;
use crate::document::{to_external_document, ExternalDocument};

/// HTTP client for a single ComfyUI instance.
#[derive(Debug, Clone)]
pub struct ComfyUIApi {
    client: reqwest::Client,
    api_url: String,
    client_id: String,
}

/// Response returned by the ComfyUI `/prompt` endpoint after
/// successfully queuing a workflow.
///
/// Every field is optional: any 2xx JSON object is a successful submit,
/// and keys not modelled here are kept in `extra`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SubmitResponse {
    /// Server-assigned identifier for the queued prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_id: Option<String>,
    /// Position in the execution queue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<i64>,
    /// Per-node validation errors reported by ComfyUI, if any.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub node_errors: serde_json::Value,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Response returned by `/upload/image`. Fields are optional for the same
/// reason as [`SubmitResponse`].
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UploadResponse {
    /// File name as stored by ComfyUI (may differ from the uploaded name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub subfolder: String,
    #[serde(rename = "type", default)]
    pub folder_type: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Errors from the ComfyUI REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum ComfyUIApiError {
    /// The HTTP request itself failed (network, DNS, TLS, decoding, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// ComfyUI returned a non-2xx status code.
    #[error("HTTP error! status: {status}: {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl ComfyUIApiError {
    /// HTTP status code of the failure, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ComfyUIApiError::ApiError { status, .. } => Some(*status),
            ComfyUIApiError::Request(err) => err.status().map(|s| s.as_u16()),
        }
    }
}

impl ComfyUIApi {
    /// Create a new API client for a ComfyUI instance.
    ///
    /// * `api_url` - Base HTTP URL, e.g. `http://host:8188`.
    pub fn new(api_url: String) -> Self {
        Self::with_client(reqwest::Client::new(), api_url)
    }

    /// Create an API client reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling or caller-chosen timeouts).
    pub fn with_client(client: reqwest::Client, api_url: String) -> Self {
        let config = ComfyUIConfig::default().with_api_url(api_url);
        Self {
            client,
            api_url: config.api_url,
            client_id: config.client_id,
        }
    }

    /// Create an API client from loaded configuration. The configured
    /// timeout, if any, applies to every request.
    pub fn from_config(config: &ComfyUIConfig) -> Result<Self, ComfyUIApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            api_url: config.api_url.clone(),
            client_id: config.client_id.clone(),
        })
    }

    /// Base HTTP API URL (e.g. `http://host:8188`).
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Client id sent with submitted prompts.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Convert a node sequence and submit it for execution.
    ///
    /// The sequence is not validated here; callers gate submission with
    /// [`imgflow_core::validation::validate_sequence`].
    pub async fn submit_workflow(
        &self,
        nodes: &[WorkflowNode],
        connections: &[Connection],
    ) -> Result<SubmitResponse, ComfyUIApiError> {
        let document = to_external_document(nodes, connections);
        self.submit_document(&document).await
    }

    /// Submit an already converted document.
    ///
    /// Sends a `POST /prompt` request with the document and client ID.
    /// Returns the parsed body, normally the server-assigned `prompt_id`
    /// and queue position.
    pub async fn submit_document(
        &self,
        document: &ExternalDocument,
    ) -> Result<SubmitResponse, ComfyUIApiError> {
        let body = serde_json::json!({
            "prompt": document,
            "client_id": self.client_id,
        });

        let request = self
            .client
            .post(format!("{}/prompt", self.api_url))
            .json(&body);
        let result = Self::send_json::<SubmitResponse>(request).await;

        match &result {
            Ok(submitted) => tracing::info!(
                prompt_id = submitted.prompt_id.as_deref().unwrap_or("<none>"),
                nodes = document.nodes.len(),
                "Workflow submitted to ComfyUI",
            ),
            Err(e) => tracing::error!(error = %e, "Error executing workflow"),
        }
        result
    }

    /// Retrieve the execution history of all prompts.
    ///
    /// Sends a `GET /history` request. The returned JSON is keyed by
    /// prompt id and contains outputs, node results, and timing data.
    pub async fn fetch_history(&self) -> Result<serde_json::Value, ComfyUIApiError> {
        let request = self.client.get(format!("{}/history", self.api_url));
        let result = Self::send_json::<serde_json::Value>(request).await;

        if let Err(e) = &result {
            tracing::error!(error = %e, "Error fetching history");
        }
        result
    }

    /// Upload an image so that a `LoadImage` node can reference it.
    ///
    /// Sends a multipart `POST /upload/image` with a single part named
    /// `image`. The stored name in the response is what belongs in the
    /// upload node's `image` field.
    pub async fn upload_image(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadResponse, ComfyUIApiError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("image", part);

        let request = self
            .client
            .post(format!("{}/upload/image", self.api_url))
            .multipart(form);
        let result = Self::send_json::<UploadResponse>(request).await;

        match &result {
            Ok(uploaded) => tracing::info!(
                name = uploaded.name.as_deref().unwrap_or("<none>"),
                "Image uploaded to ComfyUI",
            ),
            Err(e) => tracing::error!(error = %e, file_name, "Error uploading image"),
        }
        result
    }

    /// Probe `GET /system_stats`.
    ///
    /// Returns `true` only when the request completes with a success
    /// status. Transport failures are reported as `false`, never as errors.
    pub async fn check_health(&self) -> bool {
        match self
            .client
            .get(format!("{}/system_stats", self.api_url))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, api_url = %self.api_url, "ComfyUI unreachable");
                false
            }
        }
    }

    // ---- private helpers ----

    /// Send a request and parse its JSON body, mapping non-2xx statuses
    /// to [`ComfyUIApiError::ApiError`].
    async fn send_json<T: serde::de::DeserializeOwned>(
        request: reqwest::RequestBuilder,
    ) -> Result<T, ComfyUIApiError> {
        let response = request.send().await?;
        Self::parse_response(response).await
    }

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
