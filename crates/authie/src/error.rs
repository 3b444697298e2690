//! Error types for the authorization flow.
//!
//! Every failure surfaces to the caller through the returned `Result`; none
//! is retried internally. Retry policy, if any, belongs to the embedder.

use crate::storage::StoreError;

/// Errors that can occur during the authorization flow.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The redirect response did not carry the required `state` parameter.
    #[error("Redirect response does not contain the required state parameter")]
    MissingStateParam,

    /// The redirect response did not carry the required `code` parameter.
    #[error("Redirect response does not contain the required code parameter")]
    MissingCodeParam,

    /// No pending authorization request matches the returned `state` value.
    ///
    /// Either this client never initiated the request, or the state was
    /// already consumed. This is the CSRF/replay defense.
    #[error("Redirect received with unrecognized state parameter: {0}")]
    UnrecognizedState(String),

    /// The provider's discovery document could not be fetched or parsed.
    #[error("Discovery failed: {0}")]
    DiscoveryFetchFailed(String),

    /// The token endpoint returned a non-success status.
    ///
    /// The body is carried as raw diagnostic detail; the provider's
    /// structured error shape (RFC 6749 §5.2) is not interpreted here.
    #[error("Token endpoint returned HTTP {status}: {body}")]
    TokenEndpointError {
        /// The HTTP status code.
        status: u16,
        /// The raw response body.
        body: String,
    },

    /// No stored token record (or no refresh token in it) to refresh with.
    #[error("No token data exists to refresh with")]
    NoTokenToRefresh,

    /// The authorization server redirected back with an error
    /// (RFC 6749 §4.1.2.1) instead of a code.
    #[error("Authorization server returned an error: {error} - {description}")]
    AuthorizationResponse {
        /// The OAuth error code, e.g. `access_denied`.
        error: String,
        /// Human-readable detail, empty when the server sent none.
        description: String,
    },

    /// The persistence layer failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// A network error occurred during the token exchange.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// An endpoint URL could not be parsed.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl AuthError {
    /// Creates a `TokenEndpointError`.
    #[must_use]
    pub fn token_endpoint_error(status: u16, body: impl Into<String>) -> Self {
        Self::TokenEndpointError {
            status,
            body: body.into(),
        }
    }

    /// Creates an `AuthorizationResponse` error from redirect parameters.
    #[must_use]
    pub fn authorization_response(error: impl Into<String>, description: impl Into<String>) -> Self {
        Self::AuthorizationResponse {
            error: error.into(),
            description: description.into(),
        }
    }

    /// Returns `true` if this is a redirect-validation failure.
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::MissingStateParam | Self::MissingCodeParam | Self::UnrecognizedState(_)
        )
    }

    /// Returns `true` if this came from the provider or the network.
    #[must_use]
    pub fn is_external_error(&self) -> bool {
        matches!(
            self,
            Self::DiscoveryFetchFailed(_)
                | Self::TokenEndpointError { .. }
                | Self::AuthorizationResponse { .. }
                | Self::Http(_)
        )
    }
}
