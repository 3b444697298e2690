//! Pending authorization request state.
//!
//! One [`PendingAuthState`] record exists per in-flight authorization
//! request. It is created and persisted when the flow departs for the
//! authorization endpoint, and claimed (read and deleted in one step) when
//! the redirect comes back, possibly in a different process instance. A
//! record is never mutated and never redeemable twice.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::codec;
use crate::random::RandomSource;
use crate::storage::{Keyspace, StoreError};

/// Random bytes consumed by the request id.
const ID_SIZE: usize = 16;

/// Random bytes consumed by the PKCE code verifier. 64 bytes encode to an
/// 86-character base64url string, inside RFC 7636's 43–128 bound.
const VERIFIER_SIZE: usize = 64;

/// State of one in-flight authorization request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAuthState {
    /// 128-bit random value formatted as a version-4 UUID. Uniquely
    /// identifies the request and doubles as the OAuth `state` parameter.
    pub id: String,

    /// PKCE code verifier: base64url of 64 independently random bytes.
    pub code_verifier: String,

    /// Opaque caller-supplied value, round-tripped unchanged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_state: Option<String>,

    /// Page to restore after redemption, when the flow was started from a
    /// page other than the redirect target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_url: Option<Url>,
}

impl PendingAuthState {
    /// Generates a fresh pending state from one draw of random bytes.
    ///
    /// `return_url` is set to `current_url` only when it differs from the
    /// redirect target, so a flow started on the redirect page itself does
    /// not navigate after redemption.
    #[must_use]
    pub fn generate(
        random: &dyn RandomSource,
        current_url: &Url,
        redirect_uri: &Url,
        user_state: Option<String>,
    ) -> Self {
        let mut bytes = [0u8; ID_SIZE + VERIFIER_SIZE];
        random.fill(&mut bytes);

        let mut id_bytes = [0u8; ID_SIZE];
        id_bytes.copy_from_slice(&bytes[..ID_SIZE]);

        let return_url = (current_url != redirect_uri).then(|| current_url.clone());

        Self {
            id: codec::uuid_v4(id_bytes),
            code_verifier: codec::base64url_encode(&bytes[ID_SIZE..]),
            user_state,
            return_url,
        }
    }
}

/// Persistence for pending authorization states, keyed by request id.
pub struct PendingStateStore {
    keys: Keyspace,
}

impl PendingStateStore {
    /// Creates a store over the namespaced keyspace.
    #[must_use]
    pub fn new(keys: Keyspace) -> Self {
        Self { keys }
    }

    fn key(id: &str) -> String {
        format!("state::{id}")
    }

    /// Persists a pending state under its id.
    ///
    /// Overwrite semantics if the same id is reused. Random generation
    /// makes that vanishingly unlikely and it is not defended against.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    pub async fn store(&self, state: &PendingAuthState) -> Result<(), StoreError> {
        tracing::debug!(state = %state.id, "storing pending authorization state");
        self.keys.set_json(&Self::key(&state.id), state).await
    }

    /// Looks up a pending state by id without consuming it.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    pub async fn read(&self, id: &str) -> Result<Option<PendingAuthState>, StoreError> {
        self.keys.get_json(&Self::key(id)).await
    }

    /// Atomically claims a pending state: reads and deletes it in one step.
    ///
    /// `None` means the id is unrecognized or was already consumed. Claiming
    /// before the network exchange guarantees a state id is redeemable at
    /// most once regardless of later failures.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    pub async fn claim(&self, id: &str) -> Result<Option<PendingAuthState>, StoreError> {
        let claimed = self.keys.take_json(&Self::key(id)).await?;
        if claimed.is_some() {
            tracing::debug!(state = %id, "claimed pending authorization state");
        }
        Ok(claimed)
    }

    /// Deletes a pending state. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    pub async fn clear(&self, id: &str) -> Result<(), StoreError> {
        self.keys.delete(&Self::key(id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    /// Hands out a fixed byte pattern, for deterministic generation.
    struct FixedRandom(u8);

    impl RandomSource for FixedRandom {
        fn fill(&self, buf: &mut [u8]) {
            for (i, b) in buf.iter_mut().enumerate() {
                *b = self.0.wrapping_add(i as u8);
            }
        }
    }

    fn urls() -> (Url, Url) {
        (
            Url::parse("https://app.example.com/deep/page").unwrap(),
            Url::parse("https://app.example.com/callback").unwrap(),
        )
    }

    #[test]
    fn test_generate_shapes() {
        let (current, redirect) = urls();
        let state = PendingAuthState::generate(&FixedRandom(0), &current, &redirect, None);

        // Version-4 UUID text.
        assert_eq!(state.id.len(), 36);
        assert_eq!(state.id.chars().nth(14), Some('4'));

        // 64 bytes -> 86 base64url characters, no padding.
        assert_eq!(state.code_verifier.len(), 86);
        assert!((43..=128).contains(&state.code_verifier.len()));
        assert!(
            state
                .code_verifier
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_generate_is_deterministic_given_bytes() {
        let (current, redirect) = urls();
        let a = PendingAuthState::generate(&FixedRandom(7), &current, &redirect, None);
        let b = PendingAuthState::generate(&FixedRandom(7), &current, &redirect, None);
        assert_eq!(a, b);

        let c = PendingAuthState::generate(&FixedRandom(8), &current, &redirect, None);
        assert_ne!(a.id, c.id);
        assert_ne!(a.code_verifier, c.code_verifier);
    }

    #[test]
    fn test_return_url_only_when_pages_differ() {
        let (current, redirect) = urls();

        let away = PendingAuthState::generate(&FixedRandom(0), &current, &redirect, None);
        assert_eq!(away.return_url, Some(current));

        let on_callback = PendingAuthState::generate(&FixedRandom(0), &redirect, &redirect, None);
        assert_eq!(on_callback.return_url, None);
    }

    #[test]
    fn test_user_state_round_trips() {
        let (current, redirect) = urls();
        let state = PendingAuthState::generate(
            &FixedRandom(0),
            &current,
            &redirect,
            Some("caller-context".to_string()),
        );
        assert_eq!(state.user_state.as_deref(), Some("caller-context"));

        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("codeVerifier"));
        assert!(json.contains("userState"));
        let back: PendingAuthState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }

    #[tokio::test]
    async fn test_store_read_claim_clear() {
        let (current, redirect) = urls();
        let store = PendingStateStore::new(Keyspace::new(Arc::new(MemoryStore::new())));
        let state = PendingAuthState::generate(&FixedRandom(1), &current, &redirect, None);

        store.store(&state).await.unwrap();
        assert_eq!(store.read(&state.id).await.unwrap(), Some(state.clone()));

        // Reading does not consume.
        assert!(store.read(&state.id).await.unwrap().is_some());

        // Claiming does, exactly once.
        assert_eq!(store.claim(&state.id).await.unwrap(), Some(state.clone()));
        assert_eq!(store.claim(&state.id).await.unwrap(), None);
        assert_eq!(store.read(&state.id).await.unwrap(), None);

        // Clear is idempotent.
        store.clear(&state.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_id_is_absent() {
        let store = PendingStateStore::new(Keyspace::new(Arc::new(MemoryStore::new())));
        assert_eq!(store.read("no-such-id").await.unwrap(), None);
        assert_eq!(store.claim("no-such-id").await.unwrap(), None);
    }
}
