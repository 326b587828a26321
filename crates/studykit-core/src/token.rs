//! Bearer credential lookup.
//!
//! The sync queue only needs to know whether a token exists and what it is;
//! acquiring and refreshing tokens is the host's business.

use std::sync::Arc;

use crate::store::DurableStore;

/// Store key holding the bearer token for [`StoredToken`].
pub const AUTH_TOKEN_KEY: &str = "auth_token";

/// Supplies the current bearer token, if any.
pub trait TokenSource: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// A fixed token (or none).
#[derive(Debug, Clone, Default)]
pub struct StaticToken(pub Option<String>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

impl TokenSource for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        self.0.clone().filter(|t| !t.is_empty())
    }
}

/// Reads the token from a durable store on every lookup, so a host that
/// logs in or out is observed immediately.
pub struct StoredToken {
    store: Arc<dyn DurableStore>,
    key: String,
}

impl StoredToken {
    pub fn new(store: Arc<dyn DurableStore>) -> Self {
        Self {
            store,
            key: AUTH_TOKEN_KEY.to_string(),
        }
    }
}

impl TokenSource for StoredToken {
    fn bearer_token(&self) -> Option<String> {
        self.store
            .get(&self.key)
            .ok()
            .flatten()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn static_token_treats_empty_as_missing() {
        assert_eq!(StaticToken::new("abc").bearer_token().as_deref(), Some("abc"));
        assert_eq!(StaticToken::new("").bearer_token(), None);
        assert_eq!(StaticToken::none().bearer_token(), None);
    }

    #[test]
    fn stored_token_tracks_store() {
        let store = Arc::new(MemoryStore::new());
        let tokens = StoredToken::new(store.clone());
        assert_eq!(tokens.bearer_token(), None);

        store.set(AUTH_TOKEN_KEY, "tok\n").unwrap();
        assert_eq!(tokens.bearer_token().as_deref(), Some("tok"));

        store.remove(AUTH_TOKEN_KEY).unwrap();
        assert_eq!(tokens.bearer_token(), None);
    }
}
