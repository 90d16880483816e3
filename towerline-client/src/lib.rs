//! Towerline HTTP Client
//!
//! A type-safe client for driving job and workflow template runs on an
//! Ansible Tower or AWX server over its REST API.
//!
//! The client covers the whole run lifecycle: resolving a template by
//! name or ID, launching it with optional parameters, streaming its
//! output, and checking completion and outcome. Exported variables the
//! run sets through marker lines or artifacts are collected on the
//! returned [`RunningJob`] handle.
//!
//! # Example
//!
//! ```no_run
//! use towerline_client::{ServerProfile, TowerClient, TowerCredentials};
//! use towerline_core::{LaunchSpec, TemplateKind};
//!
//! #[tokio::main]
//! async fn main() -> towerline_client::Result<()> {
//!     let profile = ServerProfile::new("https://tower.example.com")
//!         .with_credentials(TowerCredentials::Oauth {
//!             token: "t0k3n".to_string(),
//!         });
//!     let client = TowerClient::new(profile)?;
//!
//!     let template = client.get_template("Deploy App", TemplateKind::Job).await?;
//!     let mut job = client
//!         .launch(template.id, &LaunchSpec::default(), TemplateKind::Job)
//!         .await?;
//!     println!("Watch the run at {}", client.job_url(job.id, job.kind));
//!
//!     let mut lines: Vec<String> = Vec::new();
//!     while !client.is_completed(&mut job).await? {
//!         client
//!             .poll_events(&mut job, &Default::default(), &mut lines)
//!             .await?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod error;

mod credentials;
mod events;
mod launch;
mod lookup;
mod status;

// Re-export commonly used types
pub use auth::TowerCredentials;
pub use error::{Result, TowerError};
pub use events::{EventSink, RunningJob, StreamOptions};

use std::sync::Arc;

use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use tokio::sync::RwLock;
use towerline_core::{TemplateKind, TowerVersion};
use tracing::{debug, warn};

use auth::TowerAuth;

/// Connection settings for one Tower / AWX server
#[derive(Debug, Clone)]
pub struct ServerProfile {
    /// Base URL of the server (e.g., "https://tower.example.com")
    pub base_url: String,
    /// Credential material to authenticate with
    pub credentials: TowerCredentials,
    /// Accept any TLS certificate the server presents
    pub trust_all_certs: bool,
}

impl ServerProfile {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            credentials: TowerCredentials::Anonymous,
            trust_all_certs: false,
        }
    }

    /// Set the credential material used for every request
    pub fn with_credentials(mut self, credentials: TowerCredentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Accept any TLS certificate the server presents
    pub fn with_trust_all_certs(mut self, trust: bool) -> Self {
        self.trust_all_certs = trust;
        self
    }
}

/// Cached result of asking the server for its version
#[derive(Debug, Clone, Copy)]
enum VersionState {
    /// Not asked yet
    Unknown,
    /// The ping endpoint reported a parseable version
    Known(TowerVersion),
    /// The ping failed or reported nothing usable; not asked again
    Unavailable,
}

/// HTTP client for the Tower / AWX REST API
///
/// All endpoints live under the `/api/v2` prefix of the configured base
/// URL. The client is cheap to clone; clones share the session token and
/// the cached server version.
#[derive(Debug, Clone)]
pub struct TowerClient {
    /// Base URL of the server, without a trailing slash
    base_url: String,
    /// HTTP client instance
    http: Client,
    /// Authorization scheme applied to every request
    auth: TowerAuth,
    /// Server version, resolved once on first use
    version: Arc<RwLock<VersionState>>,
}

impl TowerClient {
    /// Create a client for the given server
    ///
    /// Builds an HTTP client from the profile; with `trust_all_certs`
    /// set, certificate validation is disabled.
    pub fn new(profile: ServerProfile) -> Result<Self> {
        let mut builder = Client::builder();
        if profile.trust_all_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let http = builder.build()?;
        Ok(Self::with_http_client(profile, http))
    }

    /// Create a client with a custom HTTP client
    ///
    /// This allows configuring timeouts, proxies, TLS settings, etc.
    pub fn with_http_client(profile: ServerProfile, http: Client) -> Self {
        Self {
            base_url: profile.base_url.trim_end_matches('/').to_string(),
            http,
            auth: TowerAuth::new(profile.credentials),
            version: Arc::new(RwLock::new(VersionState::Unknown)),
        }
    }

    /// Base URL of the server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Credential material this client was built with
    pub fn credentials(&self) -> &TowerCredentials {
        self.auth.credentials()
    }

    /// Browser-facing URL for a run
    pub fn job_url(&self, job_id: i64, kind: TemplateKind) -> String {
        format!("{}/#/{}/{}", self.base_url, kind.url_segment(), job_id)
    }

    fn api_base(&self) -> String {
        format!("{}/api/v2", self.base_url)
    }

    fn api_url(&self, endpoint: &str) -> String {
        let separator = if endpoint.starts_with('/') { "" } else { "/" };
        format!("{}{separator}{endpoint}", self.api_base())
    }

    // =============================================================================
    // Request Core
    // =============================================================================

    pub(crate) async fn get(&self, endpoint: &str) -> Result<(StatusCode, String)> {
        self.send(Method::GET, endpoint, &[], None, false).await
    }

    pub(crate) async fn get_with_params(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<(StatusCode, String)> {
        self.send(Method::GET, endpoint, params, None, false).await
    }

    pub(crate) async fn post(&self, endpoint: &str, body: &Value) -> Result<(StatusCode, String)> {
        self.send(Method::POST, endpoint, &[], Some(body), false)
            .await
    }

    /// Send one API request and classify the broad failure statuses
    ///
    /// 404 and 401 are turned into errors here so every caller sees the
    /// same "does not exist" and "rejected credentials" behavior; any
    /// other status is handed back with the body for the caller to judge.
    /// With `skip_auth` the request goes out bare, which the version
    /// resolution itself relies on.
    async fn send(
        &self,
        method: Method,
        endpoint: &str,
        params: &[(&str, String)],
        body: Option<&Value>,
        skip_auth: bool,
    ) -> Result<(StatusCode, String)> {
        let url = self.api_url(endpoint);
        let mut request = self.http.request(method.clone(), &url);
        if !params.is_empty() {
            request = request.query(params);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        if !skip_auth {
            let version = self.resolved_version().await;
            request = self
                .auth
                .apply(request, &self.http, &self.api_base(), version.as_ref())
                .await?;
        }
        debug!(%method, %url, "sending request");
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        match status {
            StatusCode::NOT_FOUND => Err(TowerError::NotFound(
                "the requested item does not exist on the server".to_string(),
            )),
            StatusCode::UNAUTHORIZED => Err(TowerError::Unauthorized(
                "the server rejected the request credentials".to_string(),
            )),
            _ => Ok((status, text)),
        }
    }

    // =============================================================================
    // Server Version
    // =============================================================================

    /// Ask the ping endpoint for the server version
    ///
    /// Returns `Ok(None)` when the endpoint answers without a version
    /// field, which very old releases do.
    pub async fn ping(&self) -> Result<Option<TowerVersion>> {
        let (status, body) = self.send(Method::GET, "/ping/", &[], None, true).await?;
        if status != StatusCode::OK {
            return Err(TowerError::api_error(status.as_u16(), body));
        }
        let parsed = parse_object(&body)?;
        match parsed.get("version").and_then(Value::as_str) {
            Some(raw) => Ok(Some(raw.parse()?)),
            None => Ok(None),
        }
    }

    /// Cached server version, resolving it on the first call
    pub async fn server_version(&self) -> Option<TowerVersion> {
        self.resolved_version().await
    }

    /// Verify that the server answers an authenticated request
    pub async fn test_connection(&self) -> Result<()> {
        let (status, body) = self.get("/jobs/").await?;
        if status != StatusCode::OK {
            return Err(TowerError::api_error(status.as_u16(), body));
        }
        Ok(())
    }

    /// Server version from the ping endpoint, resolved once and cached
    ///
    /// Resolution failures are logged and treated as an unknown version;
    /// the server is not asked again.
    async fn resolved_version(&self) -> Option<TowerVersion> {
        {
            let state = self.version.read().await;
            match *state {
                VersionState::Known(version) => return Some(version),
                VersionState::Unavailable => return None,
                VersionState::Unknown => {}
            }
        }
        let mut state = self.version.write().await;
        match *state {
            VersionState::Known(version) => return Some(version),
            VersionState::Unavailable => return None,
            VersionState::Unknown => {}
        }
        match Box::pin(self.ping()).await {
            Ok(Some(version)) => {
                debug!(%version, "resolved server version");
                *state = VersionState::Known(version);
                Some(version)
            }
            Ok(None) => {
                debug!("server did not report a version");
                *state = VersionState::Unavailable;
                None
            }
            Err(error) => {
                warn!("could not resolve the server version: {error}");
                *state = VersionState::Unavailable;
                None
            }
        }
    }
}

/// Parse a response body as JSON
pub(crate) fn parse_object(body: &str) -> Result<Value> {
    serde_json::from_str(body)
        .map_err(|error| TowerError::ParseError(format!("response was not valid JSON: {error}")))
}
