//! Configuration management for Mirage
//!
//! Configuration is loaded from environment variables.

use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;

/// Which client-facing protocol family the facade impersonates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacadeMode {
    /// OpenAI-compatible server (LM Studio style)
    OpenAi,
    /// Ollama server, including the `/api/*` endpoints
    Ollama,
}

impl FacadeMode {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" | "lmstudio" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => bail!("Invalid MIRAGE_MODE '{}': expected openai or ollama", other),
        }
    }

    fn default_port(self) -> u16 {
        match self {
            Self::OpenAi => 1235,
            Self::Ollama => 11434,
        }
    }
}

/// Remote transport used for attachment uploads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadBackendKind {
    /// Anonymous public file host (multipart POST, body is the URL)
    Anonymous,
    /// Vendor signed-URL object storage flow
    SignedUrl,
}

impl UploadBackendKind {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "anonymous" | "0x0" => Ok(Self::Anonymous),
            "signed" | "signed-url" | "sts" => Ok(Self::SignedUrl),
            other => bail!("Invalid UPLOAD_BACKEND '{}': expected anonymous or signed", other),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Protocol family exposed to clients
    pub mode: FacadeMode,
    /// Model used when a request does not name one
    pub default_model: String,

    /// Vendor API base URL (e.g. `https://chat.qwen.ai/api`)
    pub vendor_api_url: String,
    /// Vendor web origin, used for Origin/Referer headers
    pub vendor_origin: String,
    /// Raw browser cookie export (JSON array of `{name, value}`)
    pub vendor_cookies: Option<String>,
    /// Optional anti-bot header values
    pub vendor_bx_ua: Option<String>,
    pub vendor_bx_umidtoken: Option<String>,
    /// Browser user agent presented to the vendor
    pub vendor_user_agent: String,
    /// Web client version header
    pub vendor_web_version: String,
    /// Completions body `version` field
    pub vendor_body_version: String,

    /// Attachment upload transport
    pub upload_backend: UploadBackendKind,
    /// Anonymous file host URL
    pub upload_host_url: String,
    /// Directory for transient attachment files
    pub upload_tmp_dir: PathBuf,
    /// Timeout for a single attachment upload (in seconds)
    pub upload_timeout_seconds: u64,

    /// Overall timeout for vendor requests (in seconds)
    pub request_timeout_seconds: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mode = FacadeMode::parse(
            &env::var("MIRAGE_MODE").unwrap_or_else(|_| "openai".to_string()),
        )?;

        Ok(Self {
            host: env::var("MIRAGE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: match env::var("MIRAGE_PORT") {
                Ok(port) => port.parse().context("Invalid MIRAGE_PORT")?,
                Err(_) => mode.default_port(),
            },
            mode,
            default_model: env::var("MIRAGE_DEFAULT_MODEL")
                .unwrap_or_else(|_| "qwen3-235b-a22b".to_string()),

            vendor_api_url: env::var("VENDOR_API_URL")
                .unwrap_or_else(|_| "https://chat.qwen.ai/api".to_string())
                .trim_end_matches('/')
                .to_string(),
            vendor_origin: env::var("VENDOR_ORIGIN")
                .unwrap_or_else(|_| "https://chat.qwen.ai".to_string())
                .trim_end_matches('/')
                .to_string(),
            vendor_cookies: non_empty_var("VENDOR_COOKIES"),
            vendor_bx_ua: non_empty_var("VENDOR_BX_UA"),
            vendor_bx_umidtoken: non_empty_var("VENDOR_BX_UMIDTOKEN"),
            vendor_user_agent: env::var("VENDOR_USER_AGENT").unwrap_or_else(|_| {
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/139.0.0.0 Safari/537.36"
                    .to_string()
            }),
            vendor_web_version: env::var("VENDOR_WEB_VERSION")
                .unwrap_or_else(|_| "0.0.191".to_string()),
            vendor_body_version: env::var("VENDOR_BODY_VERSION")
                .unwrap_or_else(|_| "2.1".to_string()),

            upload_backend: UploadBackendKind::parse(
                &env::var("UPLOAD_BACKEND").unwrap_or_else(|_| "anonymous".to_string()),
            )?,
            upload_host_url: env::var("UPLOAD_HOST_URL")
                .unwrap_or_else(|_| "https://0x0.st".to_string()),
            upload_tmp_dir: env::var("UPLOAD_TMP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| env::temp_dir()),
            upload_timeout_seconds: env::var("UPLOAD_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("Invalid UPLOAD_TIMEOUT_SECONDS")?,

            request_timeout_seconds: env::var("REQUEST_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .context("Invalid REQUEST_TIMEOUT_SECONDS")?,
        })
    }

    /// Configuration pointing every outbound URL at `base_url`
    ///
    /// Used by tests that stand up a mock vendor.
    pub fn for_vendor(base_url: &str) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            mode: FacadeMode::OpenAi,
            default_model: "qwen3-235b-a22b".to_string(),
            vendor_api_url: format!("{}/api", base_url.trim_end_matches('/')),
            vendor_origin: base_url.trim_end_matches('/').to_string(),
            vendor_cookies: Some(r#"[{"name":"token","value":"test-token"}]"#.to_string()),
            vendor_bx_ua: None,
            vendor_bx_umidtoken: None,
            vendor_user_agent: "mirage-test".to_string(),
            vendor_web_version: "0.0.191".to_string(),
            vendor_body_version: "2.1".to_string(),
            upload_backend: UploadBackendKind::Anonymous,
            upload_host_url: format!("{}/upload", base_url.trim_end_matches('/')),
            upload_tmp_dir: env::temp_dir(),
            upload_timeout_seconds: 5,
            request_timeout_seconds: 30,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
