//! Error types for the upstream client.

use thiserror::Error;

use crate::client::Resource;

/// Errors raised while exchanging credentials for a session token.
///
/// Any of these is fatal at startup: without a token no scrape can succeed.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The token request never produced a response.
    #[error("Token request failed: {0}")]
    Transport(String),

    /// The control plane answered with a non-2xx status.
    #[error("Token request rejected with HTTP {status}")]
    Rejected { status: u16 },

    /// The response body was not the expected JSON document.
    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    /// The response decoded but carried no usable `access_token`.
    #[error("Token response did not contain an access_token")]
    MissingToken,
}

/// What went wrong while fetching a single resource.
#[derive(Debug, Error)]
pub enum FetchErrorKind {
    /// Connection, timeout or other transport-level failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-2xx status. An expired token shows up here as 401.
    #[error("upstream returned HTTP {0}")]
    Status(u16),

    /// The body could not be decoded as JSON.
    #[error("invalid JSON body: {0}")]
    Decode(String),
}

/// A failed fetch of one control-plane resource.
#[derive(Debug, Error)]
#[error("Failed to fetch {resource}: {kind}")]
pub struct FetchError {
    /// The resource being fetched.
    pub resource: Resource,
    /// The underlying cause.
    #[source]
    pub kind: FetchErrorKind,
}

impl FetchError {
    /// Create a fetch error for `resource`.
    pub fn new(resource: Resource, kind: FetchErrorKind) -> Self {
        Self { resource, kind }
    }

    /// Create a status error.
    pub fn status(resource: Resource, status: u16) -> Self {
        Self::new(resource, FetchErrorKind::Status(status))
    }
}
