//! Authenticated client for the Marzban control-plane API.

use std::error::Error as _;
use std::fmt::{self, Write as _};
use std::future::Future;
use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, trace};

use crate::config::MarzbanConfig;
use crate::error::{AuthError, FetchError, FetchErrorKind};

/// A control-plane resource polled on every scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Nodes,
    NodesUsage,
    System,
    Core,
    Users,
}

impl Resource {
    /// All resources, in scrape order.
    pub const ALL: [Resource; 5] = [
        Resource::Nodes,
        Resource::NodesUsage,
        Resource::System,
        Resource::Core,
        Resource::Users,
    ];

    /// Path relative to the API root.
    pub fn path(&self) -> &'static str {
        match self {
            Resource::Nodes => "/nodes",
            Resource::NodesUsage => "/nodes/usage",
            Resource::System => "/system",
            Resource::Core => "/core",
            Resource::Users => "/users",
        }
    }

    /// Short name used in errors and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Nodes => "nodes",
            Resource::NodesUsage => "nodes_usage",
            Resource::System => "system",
            Resource::Core => "core",
            Resource::Users => "users",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of control-plane documents.
///
/// The translator only talks to the control plane through this trait, so
/// tests can substitute an in-memory implementation.
pub trait ControlPlane: Send + Sync + 'static {
    /// Fetch one resource as untyped JSON.
    fn fetch(&self, resource: Resource) -> impl Future<Output = Result<Value, FetchError>> + Send;
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

/// HTTP client holding one session token for the lifetime of the process.
///
/// The token is never refreshed. Once it expires every fetch fails with
/// [`FetchErrorKind::Status`] 401.
#[derive(Clone)]
pub struct MarzbanClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
}

impl MarzbanClient {
    /// Exchange credentials for a session token and build the client.
    pub async fn authenticate(config: &MarzbanConfig) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        let api_url = api_url(&config.url);
        let url = format!("{}/admin/token", api_url);

        debug!(url = %url, username = %config.username, "Requesting session token");

        let response = http
            .post(&url)
            .form(&[
                ("username", config.username.as_str()),
                ("password", config.password.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::Transport(transport_cause(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Rejected {
                status: status.as_u16(),
            });
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        let token = match body.access_token {
            Some(token) if !token.is_empty() => token,
            _ => return Err(AuthError::MissingToken),
        };

        info!(api = %api_url, "Session token acquired");

        Ok(Self {
            http,
            api_url,
            token,
        })
    }

    /// The API root all resource paths are resolved against.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

impl ControlPlane for MarzbanClient {
    async fn fetch(&self, resource: Resource) -> Result<Value, FetchError> {
        let url = format!("{}{}", self.api_url, resource.path());
        trace!(resource = %resource, url = %url, "Fetching resource");

        let response = self
            .http
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .send()
            .await
            .map_err(|e| FetchError::new(resource, FetchErrorKind::Transport(transport_cause(&e))))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::status(resource, status.as_u16()));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| FetchError::new(resource, FetchErrorKind::Decode(e.to_string())))
    }
}

/// Describe a transport failure including its source chain.
///
/// `reqwest::Error`'s own message only names the URL; the actual cause
/// (timeout, refused connection, DNS) lives in its sources.
fn transport_cause(err: &reqwest::Error) -> String {
    let kind = if err.is_timeout() {
        "timed out"
    } else if err.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };

    let mut message = format!("{}: {}", kind, err);
    let mut source = err.source();
    while let Some(cause) = source {
        write!(message, ": {}", cause).ok();
        source = cause.source();
    }
    message
}

/// Build the API root from the configured base URL.
fn api_url(base: &str) -> String {
    format!("{}/api", base.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_paths() {
        let paths: Vec<_> = Resource::ALL.iter().map(|r| r.path()).collect();
        assert_eq!(
            paths,
            vec!["/nodes", "/nodes/usage", "/system", "/core", "/users"]
        );
    }

    #[test]
    fn test_resource_display() {
        assert_eq!(Resource::NodesUsage.to_string(), "nodes_usage");
        assert_eq!(Resource::Core.to_string(), "core");
    }

    #[test]
    fn test_api_url_strips_trailing_slash() {
        assert_eq!(api_url("https://panel.example.com"), "https://panel.example.com/api");
        assert_eq!(api_url("https://panel.example.com/"), "https://panel.example.com/api");
        assert_eq!(api_url("http://10.0.0.1:8000//"), "http://10.0.0.1:8000/api");
    }
}
