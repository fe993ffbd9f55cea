use std::time::Duration;

/// Base URL of a ComfyUI started with default flags.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8188";

/// Client id sent with every submitted prompt.
pub const DEFAULT_CLIENT_ID: &str = "workflow-builder";

/// ComfyUI connection settings loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ComfyUIConfig {
    /// Base HTTP URL, without a trailing slash.
    pub api_url: String,
    pub client_id: String,
    /// Per-request timeout. `None` leaves requests unbounded.
    pub timeout: Option<Duration>,
}

impl Default for ComfyUIConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            timeout: None,
        }
    }
}

impl ComfyUIConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                 |
    /// |------------------------|-------------------------|
    /// | `COMFYUI_URL`          | `http://127.0.0.1:8188` |
    /// | `COMFYUI_CLIENT_ID`    | `workflow-builder`      |
    /// | `COMFYUI_TIMEOUT_SECS` | unset (no timeout)      |
    ///
    /// An unparsable timeout is ignored with a warning.
    pub fn from_env() -> Self {
        let api_url = std::env::var("COMFYUI_URL").unwrap_or_else(|_| DEFAULT_API_URL.into());
        let client_id =
            std::env::var("COMFYUI_CLIENT_ID").unwrap_or_else(|_| DEFAULT_CLIENT_ID.into());

        let timeout = std::env::var("COMFYUI_TIMEOUT_SECS").ok().and_then(|raw| {
            match raw.parse::<u64>() {
                Ok(secs) => Some(Duration::from_secs(secs)),
                Err(_) => {
                    tracing::warn!(value = %raw, "Ignoring invalid COMFYUI_TIMEOUT_SECS");
                    None
                }
            }
        });

        Self {
            api_url: normalize_url(api_url),
            client_id,
            timeout,
        }
    }

    /// Same settings with a different base URL.
    pub fn with_api_url(self, api_url: impl Into<String>) -> Self {
        Self {
            api_url: normalize_url(api_url.into()),
            ..self
        }
    }
}

fn normalize_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
