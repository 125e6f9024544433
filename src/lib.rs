//! Mirage - OpenAI and Ollama compatible facade for a vendor chat web API
//!
//! Clients talk to Mirage as if it were a local model server. Each request is
//! translated into the vendor's session-scoped chat protocol, and the vendor's
//! event stream is translated back into the client's wire format.

pub mod activity;
pub mod config;
pub mod error;
pub mod facade;
pub mod protocol;
pub mod routes;
pub mod streaming;
pub mod tokens;
pub mod transform;
pub mod translate;
pub mod uploads;
pub mod vendor;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;

pub use crate::config::{Config, FacadeMode, UploadBackendKind};
pub use crate::facade::{ProtocolFacade, Reply, Surface};

use crate::activity::{ActivitySink, TracingActivity};
use crate::translate::RequestTranslator;
use crate::uploads::{
    AnonymousHostBackend, AttachmentUploader, SignedUrlBackend, UploadBackend, UploadCache,
};
use crate::vendor::{BrowserHeaders, HeaderSource, ModelCatalog, SessionManager, VendorApi, VendorClient};

/// Application state shared across all request handlers
pub struct AppState {
    pub config: Config,
    pub start_time: Instant,
    pub vendor: Arc<dyn VendorApi>,
    pub catalog: Arc<ModelCatalog>,
    /// Content-addressed upload cache, cleared whenever a session starts
    pub upload_cache: Arc<UploadCache>,
    pub sessions: Arc<SessionManager>,
    pub facade: Arc<ProtocolFacade>,
    pub activity: Arc<dyn ActivitySink>,
}

impl AppState {
    /// Create a new application state
    pub fn new(config: Config) -> Result<Self> {
        // Initialize HTTP client with connection pooling
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(100)
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        let headers: Arc<dyn HeaderSource> = Arc::new(BrowserHeaders::from_config(&config));
        let vendor: Arc<dyn VendorApi> = Arc::new(VendorClient::new(
            http_client.clone(),
            &config,
            headers.clone(),
        ));

        let upload_timeout = Duration::from_secs(config.upload_timeout_seconds);
        let backend: Arc<dyn UploadBackend> = match config.upload_backend {
            UploadBackendKind::Anonymous => Arc::new(AnonymousHostBackend::new(
                http_client.clone(),
                config.upload_host_url.clone(),
                upload_timeout,
            )),
            UploadBackendKind::SignedUrl => Arc::new(SignedUrlBackend::new(
                http_client,
                &config.vendor_api_url,
                headers,
                upload_timeout,
            )),
        };

        Ok(Self::with_parts(config, vendor, backend, Arc::new(TracingActivity)))
    }

    /// Assemble the state around explicit collaborators.
    ///
    /// Tests use this to swap in a fake vendor or upload backend.
    pub fn with_parts(
        config: Config,
        vendor: Arc<dyn VendorApi>,
        backend: Arc<dyn UploadBackend>,
        activity: Arc<dyn ActivitySink>,
    ) -> Self {
        let upload_cache = Arc::new(UploadCache::new());
        let catalog = Arc::new(ModelCatalog::new(vendor.clone()));
        let uploader = Arc::new(AttachmentUploader::new(
            backend,
            upload_cache.clone(),
            config.upload_tmp_dir.clone(),
        ));
        let translator = Arc::new(RequestTranslator::new(
            uploader,
            catalog.clone(),
            activity.clone(),
            config.vendor_body_version.clone(),
        ));
        let sessions = Arc::new(SessionManager::new(vendor.clone(), upload_cache.clone()));
        let facade = Arc::new(ProtocolFacade::new(
            translator,
            sessions.clone(),
            vendor.clone(),
            activity.clone(),
            config.default_model.clone(),
        ));

        Self {
            config,
            start_time: Instant::now(),
            vendor,
            catalog,
            upload_cache,
            sessions,
            facade,
            activity,
        }
    }
}
