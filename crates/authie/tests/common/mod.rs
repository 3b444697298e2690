#![allow(dead_code)]

use std::sync::Mutex;

use authie::Navigator;
use serde_json::{Value, json};
use url::Url;

/// A scripted browsing context: the current URL is settable from the test,
/// and navigations are recorded instead of performed.
pub struct FakeNavigator {
    current: Mutex<Url>,
    assigned: Mutex<Vec<Url>>,
    replaced: Mutex<Vec<Url>>,
}

impl FakeNavigator {
    pub fn new(current: &str) -> Self {
        Self {
            current: Mutex::new(Url::parse(current).unwrap()),
            assigned: Mutex::new(Vec::new()),
            replaced: Mutex::new(Vec::new()),
        }
    }

    pub fn set_current(&self, url: &str) {
        *self.current.lock().unwrap() = Url::parse(url).unwrap();
    }

    pub fn assigned(&self) -> Vec<Url> {
        self.assigned.lock().unwrap().clone()
    }

    pub fn replaced(&self) -> Vec<Url> {
        self.replaced.lock().unwrap().clone()
    }
}

impl Navigator for FakeNavigator {
    fn current_url(&self) -> Url {
        self.current.lock().unwrap().clone()
    }

    fn assign(&self, url: &Url) {
        self.assigned.lock().unwrap().push(url.clone());
    }

    fn replace(&self, url: &Url) {
        self.replaced.lock().unwrap().push(url.clone());
    }
}

/// A minimal but complete discovery document rooted at `base`.
pub fn discovery_document(base: &str) -> Value {
    json!({
        "issuer": base,
        "authorization_endpoint": format!("{base}/authorize"),
        "token_endpoint": format!("{base}/token"),
        "jwks_uri": format!("{base}/keys"),
        "response_types_supported": ["code"],
        "response_modes_supported": ["query", "fragment"],
        "subject_types_supported": ["pairwise"],
        "id_token_signing_alg_values_supported": ["RS256"],
        "scopes_supported": ["openid", "profile", "email", "offline_access"],
    })
}
