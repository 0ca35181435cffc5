use std::time::Duration;

use shotforge_cloud::S3Config;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for open connections to drain before
    /// exiting anyway (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Generation backend settings (ComfyUI URL, workflow template).
    pub generation: GenerationConfig,
    /// Object storage settings used by the asset retrieval proxy.
    pub storage: S3Config,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    ///
    /// The generation and storage sub-configs document their own
    /// variables.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let generation = GenerationConfig::from_env();
        let storage = storage_from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            generation,
            storage,
        }
    }
}

/// Settings for the ComfyUI generation backend.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Base URL jobs are submitted to.
    pub comfyui_url: String,
    /// Workflow template JSON, loaded once at startup.
    pub workflow_template_path: String,
}

impl GenerationConfig {
    /// | Env Var                  | Default                  |
    /// |--------------------------|--------------------------|
    /// | `COMFYUI_URL`            | `http://localhost:8188`  |
    /// | `WORKFLOW_TEMPLATE_PATH` | `templates/wan_t2v.json` |
    pub fn from_env() -> Self {
        let comfyui_url =
            std::env::var("COMFYUI_URL").unwrap_or_else(|_| "http://localhost:8188".into());

        let workflow_template_path = std::env::var("WORKFLOW_TEMPLATE_PATH")
            .unwrap_or_else(|_| "templates/wan_t2v.json".into());

        Self {
            comfyui_url,
            workflow_template_path,
        }
    }
}

/// Object storage settings from `S3_*` environment variables.
///
/// | Env Var                | Default      |
/// |------------------------|--------------|
/// | `S3_BUCKET`            | -- (required) |
/// | `S3_REGION`            | `us-east-1`  |
/// | `S3_ENDPOINT`          | unset        |
/// | `S3_FORCE_PATH_STYLE`  | `false`      |
/// | `S3_ACCESS_KEY_ID`     | unset        |
/// | `S3_SECRET_ACCESS_KEY` | unset        |
/// | `SIGNED_URL_TTL_SECS`  | `600`        |
fn storage_from_env() -> S3Config {
    let signed_url_ttl_secs: u64 = std::env::var("SIGNED_URL_TTL_SECS")
        .unwrap_or_else(|_| "600".into())
        .parse()
        .expect("SIGNED_URL_TTL_SECS must be a valid u64");

    S3Config {
        bucket: std::env::var("S3_BUCKET").expect("S3_BUCKET must be set"),
        region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into()),
        endpoint: std::env::var("S3_ENDPOINT").ok(),
        force_path_style: std::env::var("S3_FORCE_PATH_STYLE")
            .unwrap_or_else(|_| "false".into())
            .parse()
            .expect("S3_FORCE_PATH_STYLE must be a valid bool"),
        access_key_id: std::env::var("S3_ACCESS_KEY_ID").ok(),
        secret_access_key: std::env::var("S3_SECRET_ACCESS_KEY").ok(),
        signed_url_ttl: Duration::from_secs(signed_url_ttl_secs),
    }
}
