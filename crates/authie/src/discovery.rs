//! OpenID Connect provider discovery.
//!
//! Fetches and caches provider metadata from the
//! `.well-known/openid-configuration` endpoint. Documents are treated as
//! immutable once fetched and cached per authority in the injected store.
//! The core enforces no expiry; refresh policy belongs to the embedder.
//!
//! Concurrent `get` calls for the same authority before the first fetch
//! lands are not deduplicated; both fetch and the later write wins.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::AuthError;
use crate::storage::Keyspace;

/// OpenID Connect provider metadata.
///
/// The fields of the `.well-known/openid-configuration` document this client
/// relies on, per [OpenID Connect Discovery 1.0]. Unknown fields are ignored.
///
/// [OpenID Connect Discovery 1.0]: https://openid.net/specs/openid-connect-discovery-1_0.html
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryDocument {
    /// URL the provider asserts as its issuer identifier.
    pub issuer: String,

    /// URL of the authorization endpoint.
    pub authorization_endpoint: String,

    /// URL of the token endpoint.
    pub token_endpoint: String,

    /// URL of the provider's JSON Web Key Set document.
    pub jwks_uri: String,

    /// OAuth 2.0 `response_type` values the provider supports.
    pub response_types_supported: Vec<String>,

    /// Subject identifier types the provider supports.
    pub subject_types_supported: Vec<String>,

    /// JWS signing algorithms supported for ID tokens.
    pub id_token_signing_alg_values_supported: Vec<String>,

    /// URL of the userinfo endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userinfo_endpoint: Option<String>,

    /// Scope values the provider supports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes_supported: Option<Vec<String>>,

    /// `response_mode` values the provider supports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_modes_supported: Option<Vec<String>>,

    /// Claim names the provider may supply values for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims_supported: Option<Vec<String>>,

    /// Whether the provider supports the `request_uri` parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_uri_parameter_supported: Option<bool>,
}

/// Path of the discovery document relative to the authority.
const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";

/// Fetches discovery documents and caches them per authority.
///
/// The cache lives in the injected store under
/// `openid-config::{authority}`, so a document fetched before a navigation
/// round trip is still available on the page load that completes the flow.
pub struct DiscoveryCache {
    keys: Keyspace,
    http: reqwest::Client,
}

impl DiscoveryCache {
    /// Creates a cache over the namespaced keyspace.
    #[must_use]
    pub fn new(keys: Keyspace, http: reqwest::Client) -> Self {
        Self { keys, http }
    }

    /// Unwraps the keyspace, for rebuilding the cache around a different
    /// HTTP client.
    pub(crate) fn into_keyspace(self) -> Keyspace {
        self.keys
    }

    fn cache_key(authority: &Url) -> String {
        format!(
            "openid-config::{}",
            authority.as_str().trim_end_matches('/')
        )
    }

    /// Builds the discovery URL, tolerant of trailing slashes and
    /// tenant-style authority paths.
    fn discovery_url(authority: &Url) -> Url {
        let mut url = authority.clone();
        let path = authority.path().trim_end_matches('/');
        url.set_path(&format!("{path}{DISCOVERY_PATH}"));
        url
    }

    /// Returns the discovery document for an authority, fetching it on a
    /// cache miss.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::DiscoveryFetchFailed`] on network failure, a
    /// non-success status, or a response that does not parse as a discovery
    /// document; [`AuthError::Storage`] if the cache cannot be read or
    /// written. No retry is attempted.
    pub async fn get(&self, authority: &Url) -> Result<DiscoveryDocument, AuthError> {
        let key = Self::cache_key(authority);

        if let Some(document) = self.keys.get_json::<DiscoveryDocument>(&key).await? {
            tracing::trace!(%authority, "discovery cache hit");
            return Ok(document);
        }

        let url = Self::discovery_url(authority);
        tracing::debug!(%authority, "fetching openid configuration");

        let response = self
            .http
            .get(url.as_str())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(%authority, error = %e, "discovery fetch failed");
                AuthError::DiscoveryFetchFailed(e.to_string())
            })?;

        if !response.status().is_success() {
            return Err(AuthError::DiscoveryFetchFailed(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let document: DiscoveryDocument = response.json().await.map_err(|e| {
            tracing::warn!(%authority, error = %e, "discovery document did not parse");
            AuthError::DiscoveryFetchFailed(e.to_string())
        })?;

        self.keys.set_json(&key, &document).await?;

        Ok(document)
    }
}
