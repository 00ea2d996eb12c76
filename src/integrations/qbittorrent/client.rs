//! HTTP client for the qBittorrent WebUI API (v2)
//!
//! Login: POST {base}/api/v2/auth/login
//! Read:  GET  {base}/api/v2/app/preferences
//! Write: POST {base}/api/v2/app/setPreferences

use super::PreferencesApi;
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Literal acknowledgement body returned by a successful login.
pub const LOGIN_OK_BODY: &str = "Ok.";

/// Name of the session cookie issued by qBittorrent.
pub const SESSION_COOKIE: &str = "SID";

#[derive(Debug, Error)]
pub enum ClientError {
    /// The service rejected the session. Re-authenticate and retry.
    #[error("authentication expired")]
    AuthExpired,

    #[error("login failed: status={status}, body={body}")]
    LoginRejected { status: u16, body: String },

    #[error("listen_port not found in preferences")]
    MissingListenPort,

    #[error("failed to decode preferences: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("unexpected status code: {status}, body: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to create HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}

impl ClientError {
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, ClientError::AuthExpired)
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            ClientError::Http(e) | ClientError::Decode(e) => e.is_timeout(),
            _ => false,
        }
    }
}

/// Session-aware client. Holds the session token explicitly instead of
/// relying on a transport cookie jar.
pub struct QbitClient {
    base_url: String,
    http: reqwest::Client,
    username: String,
    password: String,
    sid: Option<String>,
}

impl std::fmt::Debug for QbitClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QbitClient")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("authenticated", &self.sid.is_some())
            .finish()
    }
}

impl QbitClient {
    pub fn new(
        base_url: &str,
        username: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(ClientError::Build)?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            username: username.to_string(),
            password: password.to_string(),
            sid: None,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Current session token, if a login has issued one.
    pub fn session_token(&self) -> Option<&str> {
        self.sid.as_deref()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/v2/{}", self.base_url, path)
    }

    fn with_session(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.sid {
            Some(sid) => request.header(COOKIE, format!("{}={}", SESSION_COOKIE, sid)),
            None => request,
        }
    }

    pub async fn login(&mut self) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.endpoint("auth/login"))
            .form(&[
                ("username", self.username.as_str()),
                ("password", self.password.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let sid = session_from_headers(response.headers());
        let body = response.text().await.unwrap_or_default();
        let body = body.trim();

        if status != StatusCode::OK || body != LOGIN_OK_BODY {
            return Err(ClientError::LoginRejected {
                status: status.as_u16(),
                body: body.to_string(),
            });
        }

        match sid {
            Some(sid) => self.sid = Some(sid),
            None => tracing::debug!("Login succeeded without a session cookie"),
        }

        tracing::info!("Successfully authenticated with qBittorrent");
        Ok(())
    }

    pub async fn listen_port(&self) -> Result<u16, ClientError> {
        let response = self
            .with_session(self.http.get(self.endpoint("app/preferences")))
            .send()
            .await?;

        let status = response.status();
        if is_expired(status) {
            return Err(ClientError::AuthExpired);
        }
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        let prefs: serde_json::Value = response.json().await.map_err(ClientError::Decode)?;
        listen_port_from_preferences(&prefs)
    }

    pub async fn update_listen_port(&self, port: u16) -> Result<(), ClientError> {
        let payload = serde_json::json!({ "listen_port": port }).to_string();

        let response = self
            .with_session(self.http.post(self.endpoint("app/setPreferences")))
            .form(&[("json", payload.as_str())])
            .send()
            .await?;

        let status = response.status();
        if is_expired(status) {
            return Err(ClientError::AuthExpired);
        }
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

impl PreferencesApi for QbitClient {
    async fn authenticate(&mut self) -> Result<(), ClientError> {
        self.login().await
    }

    async fn get_listen_port(&mut self) -> Result<u16, ClientError> {
        self.listen_port().await
    }

    async fn set_listen_port(&mut self, port: u16) -> Result<(), ClientError> {
        self.update_listen_port(port).await
    }
}

fn is_expired(status: StatusCode) -> bool {
    status == StatusCode::FORBIDDEN || status == StatusCode::UNAUTHORIZED
}

/// Extract `listen_port` from a preferences object.
///
/// Any JSON number with an integral value in [0, 65535] is accepted, so
/// `6881` and `6881.0` read the same.
pub fn listen_port_from_preferences(prefs: &serde_json::Value) -> Result<u16, ClientError> {
    let value = prefs
        .get("listen_port")
        .ok_or(ClientError::MissingListenPort)?;

    let port = match value.as_u64() {
        Some(n) => u16::try_from(n).ok(),
        None => value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && (0.0..=f64::from(u16::MAX)).contains(f))
            .map(|f| f as u16),
    };

    port.ok_or(ClientError::MissingListenPort)
}

/// Find the session cookie value among `Set-Cookie` headers.
pub fn session_from_headers(headers: &reqwest::header::HeaderMap) -> Option<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .find_map(parse_session_cookie)
}

fn parse_session_cookie(header: &str) -> Option<String> {
    let pair = header.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    if name.trim() != SESSION_COOKIE {
        return None;
    }
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
