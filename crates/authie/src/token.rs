//! Token records and their persistence.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::storage::{Keyspace, StoreError};

/// Wire shape of a successful token endpoint response (RFC 6749 §5.1).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// The access token issued by the authorization server.
    pub access_token: String,

    /// The token type, usually `Bearer`.
    pub token_type: String,

    /// Lifetime of the access token in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,

    /// Refresh token for obtaining new access tokens.
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Granted scopes, when they differ from the requested ones.
    #[serde(default)]
    pub scope: Option<String>,
}

/// The persisted result of a successful exchange or refresh.
///
/// This is the wire response plus a locally stamped issue timestamp. The
/// record is overwritten wholesale on every successful exchange; fields are
/// never merged with a previous record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// The access token.
    pub access_token: String,

    /// The token type, usually `Bearer`.
    pub token_type: String,

    /// Lifetime of the access token in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,

    /// Refresh token for obtaining new access tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Granted scopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// When this record was received, as epoch milliseconds. Stamped
    /// locally, not supplied by the provider. Freshness policy against
    /// `expires_in` is the caller's business.
    #[serde(rename = "issuedAt")]
    pub issued_at: i64,
}

impl TokenRecord {
    /// Builds a record from a wire response with an explicit issue time.
    #[must_use]
    pub fn from_response(response: TokenResponse, issued_at: i64) -> Self {
        Self {
            access_token: response.access_token,
            token_type: response.token_type,
            expires_in: response.expires_in,
            refresh_token: response.refresh_token,
            scope: response.scope,
            issued_at,
        }
    }

    /// Builds a record from a wire response, stamped with the current time.
    #[must_use]
    pub fn stamp(response: TokenResponse) -> Self {
        Self::from_response(response, now_epoch_ms())
    }
}

fn now_epoch_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Persistence for the most recent token record.
pub struct TokenStore {
    keys: Keyspace,
}

/// Storage key for the current token record.
const TOKENS_KEY: &str = "tokens";

impl TokenStore {
    /// Creates a store over the namespaced keyspace.
    #[must_use]
    pub fn new(keys: Keyspace) -> Self {
        Self { keys }
    }

    /// Returns the current token record, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    pub async fn get(&self) -> Result<Option<TokenRecord>, StoreError> {
        self.keys.get_json(TOKENS_KEY).await
    }

    /// Replaces the current token record wholesale.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    pub async fn set(&self, record: &TokenRecord) -> Result<(), StoreError> {
        self.keys.set_json(TOKENS_KEY, record).await
    }

    /// Deletes the current token record. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.keys.delete(TOKENS_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    fn record(access: &str, refresh: Option<&str>) -> TokenRecord {
        TokenRecord {
            access_token: access.to_string(),
            token_type: "Bearer".to_string(),
            expires_in: Some(3600),
            refresh_token: refresh.map(String::from),
            scope: Some("openid profile".to_string()),
            issued_at: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_response_optional_fields_default() {
        let json = r#"{"access_token":"at","token_type":"Bearer"}"#;
        let response: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.access_token, "at");
        assert_eq!(response.expires_in, None);
        assert_eq!(response.refresh_token, None);
        assert_eq!(response.scope, None);
    }

    #[test]
    fn test_stamp_sets_issue_time() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token":"at","token_type":"Bearer"}"#).unwrap();
        let record = TokenRecord::stamp(response);
        // Epoch milliseconds, sometime after 2023.
        assert!(record.issued_at > 1_600_000_000_000);
    }

    #[test]
    fn test_record_serde_shape() {
        let json = serde_json::to_string(&record("at", None)).unwrap();
        assert!(json.contains("issuedAt"));
        // Absent optionals are not serialized.
        assert!(!json.contains("refresh_token"));

        let back: TokenRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record("at", None));
    }

    #[tokio::test]
    async fn test_store_overwrites_wholesale() {
        let store = TokenStore::new(Keyspace::new(Arc::new(MemoryStore::new())));
        assert_eq!(store.get().await.unwrap(), None);

        store.set(&record("old", Some("r1"))).await.unwrap();
        assert_eq!(
            store.get().await.unwrap().unwrap().refresh_token.as_deref(),
            Some("r1")
        );

        // A record without a refresh token replaces everything; nothing is
        // merged from the previous record.
        store.set(&record("new", None)).await.unwrap();
        let current = store.get().await.unwrap().unwrap();
        assert_eq!(current.access_token, "new");
        assert_eq!(current.refresh_token, None);

        store.clear().await.unwrap();
        assert_eq!(store.get().await.unwrap(), None);
    }
}
