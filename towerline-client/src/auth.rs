//! Authentication schemes for Tower / AWX requests
//!
//! Three kinds of credential material are supported: none, an OAuth
//! bearer token, and a username/password pair. Basic credentials are
//! exchanged once for a session token; servers without a token endpoint
//! fall back to basic authentication on every request. Whether a session
//! token rides in a `Bearer` or legacy `Token` header depends on the
//! server version.

use std::fmt;
use std::sync::Arc;

use reqwest::{RequestBuilder, StatusCode, header};
use serde_json::{Value, json};
use tokio::sync::RwLock;
use towerline_core::TowerVersion;
use tracing::debug;

use crate::error::{Result, TowerError};

/// Lowest Tower release that takes session tokens in a `Bearer` header
const TOWER_BEARER_MIN: TowerVersion = TowerVersion::new(3, 3, 0);
/// AWX releases from this point also take `Bearer` headers
const AWX_BEARER_MIN: TowerVersion = TowerVersion::new(1, 0, 7);
/// AWX-style release numbering ends below this version
const AWX_SERIES_CAP: TowerVersion = TowerVersion::new(2, 0, 0);

/// Credential material for a Tower server
#[derive(Clone)]
pub enum TowerCredentials {
    /// No credentials; requests go out unauthenticated
    Anonymous,
    /// Username and password
    Basic { username: String, password: String },
    /// OAuth bearer token
    Oauth { token: String },
}

impl TowerCredentials {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, TowerCredentials::Anonymous)
    }
}

impl fmt::Debug for TowerCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => write!(f, "Anonymous"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::Oauth { .. } => f
                .debug_struct("Oauth")
                .field("token", &"<redacted>")
                .finish(),
        }
    }
}

/// Session token state for basic credentials
#[derive(Clone)]
enum TokenState {
    /// No exchange attempted yet
    Unresolved,
    /// The server handed out a session token
    Token(String),
    /// The server has no token endpoint; send basic credentials everywhere
    BasicOnly,
}

impl fmt::Debug for TokenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unresolved => write!(f, "Unresolved"),
            Self::Token(_) => write!(f, "Token(<redacted>)"),
            Self::BasicOnly => write!(f, "BasicOnly"),
        }
    }
}

/// Scheme to put on the current request
enum SessionScheme {
    Token(String),
    Basic,
}

/// Applies the right authorization scheme to outgoing requests
#[derive(Debug, Clone)]
pub(crate) struct TowerAuth {
    credentials: TowerCredentials,
    session: Arc<RwLock<TokenState>>,
}

impl TowerAuth {
    pub(crate) fn new(credentials: TowerCredentials) -> Self {
        Self {
            credentials,
            session: Arc::new(RwLock::new(TokenState::Unresolved)),
        }
    }

    pub(crate) fn credentials(&self) -> &TowerCredentials {
        &self.credentials
    }

    /// Apply this server's authorization scheme to a request
    ///
    /// `version` is the server version if known; it decides the header a
    /// session token rides in.
    pub(crate) async fn apply(
        &self,
        builder: RequestBuilder,
        http: &reqwest::Client,
        api_base: &str,
        version: Option<&TowerVersion>,
    ) -> Result<RequestBuilder> {
        match &self.credentials {
            TowerCredentials::Anonymous => Ok(builder),
            TowerCredentials::Oauth { token } => Ok(builder.bearer_auth(token)),
            TowerCredentials::Basic { username, password } => {
                let scheme = self
                    .resolve_session(http, api_base, username, password)
                    .await?;
                match scheme {
                    SessionScheme::Token(token) if bearer_header_supported(version) => {
                        Ok(builder.bearer_auth(token))
                    }
                    SessionScheme::Token(token) => {
                        Ok(builder.header(header::AUTHORIZATION, format!("Token {token}")))
                    }
                    SessionScheme::Basic => Ok(builder.basic_auth(username, Some(password))),
                }
            }
        }
    }

    /// Exchange basic credentials for a session token, once
    async fn resolve_session(
        &self,
        http: &reqwest::Client,
        api_base: &str,
        username: &str,
        password: &str,
    ) -> Result<SessionScheme> {
        {
            let state = self.session.read().await;
            match &*state {
                TokenState::Token(token) => return Ok(SessionScheme::Token(token.clone())),
                TokenState::BasicOnly => return Ok(SessionScheme::Basic),
                TokenState::Unresolved => {}
            }
        }
        let mut state = self.session.write().await;
        // Another task may have resolved while we waited for the lock.
        match &*state {
            TokenState::Token(token) => return Ok(SessionScheme::Token(token.clone())),
            TokenState::BasicOnly => return Ok(SessionScheme::Basic),
            TokenState::Unresolved => {}
        }
        let resolved = request_token(http, api_base, username, password).await?;
        let scheme = match &resolved {
            TokenState::Token(token) => SessionScheme::Token(token.clone()),
            _ => SessionScheme::Basic,
        };
        *state = resolved;
        Ok(scheme)
    }
}

/// Ask the token endpoint for a session token
async fn request_token(
    http: &reqwest::Client,
    api_base: &str,
    username: &str,
    password: &str,
) -> Result<TokenState> {
    let url = format!("{api_base}/authtoken/");
    debug!(%url, "requesting a session token");
    let response = http
        .post(&url)
        .basic_auth(username, Some(password))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await?;
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        debug!("no token endpoint on this server, staying with basic authentication");
        return Ok(TokenState::BasicOnly);
    }
    let body = response.text().await?;
    if status == StatusCode::BAD_REQUEST {
        return Err(TowerError::Unauthorized(
            "the server rejected the username/password".to_string(),
        ));
    }
    if !status.is_success() {
        return Err(TowerError::api_error(status.as_u16(), body));
    }
    let parsed: Value = serde_json::from_str(&body)
        .map_err(|error| TowerError::ParseError(format!("token response was not JSON: {error}")))?;
    let token = parsed
        .get("token")
        .and_then(Value::as_str)
        .ok_or_else(|| TowerError::ParseError("token response carried no token".to_string()))?;
    Ok(TokenState::Token(token.to_string()))
}

/// Whether session tokens ride in a `Bearer` header on this server
///
/// Tower from 3.3.0 and the AWX 1.x series from 1.0.7 take `Bearer`;
/// everything else, including servers whose version is unknown, gets the
/// legacy `Token` header. The comparison is the historical one unless the
/// `strict-version-gate` feature is enabled.
fn bearer_header_supported(version: Option<&TowerVersion>) -> bool {
    let Some(version) = version else {
        return false;
    };
    #[cfg(feature = "strict-version-gate")]
    return version.is_at_least(&TOWER_BEARER_MIN)
        || (!version.is_at_least(&AWX_SERIES_CAP) && version.is_at_least(&AWX_BEARER_MIN));
    #[cfg(not(feature = "strict-version-gate"))]
    return version.is_greater_or_equal(&TOWER_BEARER_MIN)
        || (!version.is_greater_or_equal(&AWX_SERIES_CAP)
            && version.is_greater_or_equal(&AWX_BEARER_MIN));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(version: &str) -> bool {
        bearer_header_supported(Some(&version.parse().unwrap()))
    }

    #[test]
    fn test_unknown_version_uses_legacy_header() {
        assert!(!bearer_header_supported(None));
    }

    #[test]
    fn test_gate_common_versions() {
        assert!(gate("3.3.0"));
        assert!(gate("3.4.1"));
        assert!(gate("1.0.7"));
        assert!(gate("1.5.2"));
        assert!(!gate("1.0.6"));
        assert!(!gate("3.2.9"));
    }

    #[cfg(not(feature = "strict-version-gate"))]
    #[test]
    fn test_gate_tower_2_passes_under_historical_ordering() {
        // 2.4.6 counts as at-or-above 3.3.0 under the historical
        // comparison because its minor is larger.
        assert!(gate("2.4.6"));
    }

    #[cfg(feature = "strict-version-gate")]
    #[test]
    fn test_gate_tower_2_fails_under_strict_ordering() {
        assert!(!gate("2.4.6"));
    }

    #[test]
    fn test_credentials_debug_redacts_secrets() {
        let basic = TowerCredentials::Basic {
            username: "ci".to_string(),
            password: "hunter2".to_string(),
        };
        let oauth = TowerCredentials::Oauth {
            token: "s3cr3t".to_string(),
        };
        assert!(!format!("{basic:?}").contains("hunter2"));
        assert!(format!("{basic:?}").contains("ci"));
        assert!(!format!("{oauth:?}").contains("s3cr3t"));
    }
}
