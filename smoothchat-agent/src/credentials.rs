//! Persisted credential access.
//!
//! The interpreter never reads credentials. It only clears them when the
//! agent rejects them, so the next request forces a fresh login.

use parking_lot::RwLock;

/// Read/clear access to stored credentials.
pub trait CredentialStore: Send + Sync {
    /// The stored credential, if any.
    fn load(&self) -> Option<String>;

    /// Forget the stored credential.
    fn clear(&self);
}

/// Credentials kept in memory.
#[derive(Debug, Default)]
pub struct InMemoryCredentials {
    token: RwLock<Option<String>>,
}

impl InMemoryCredentials {
    /// Store `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }

    /// Start with nothing stored.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Replace the stored credential.
    pub fn set(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
    }
}

impl CredentialStore for InMemoryCredentials {
    fn load(&self) -> Option<String> {
        self.token.read().clone()
    }

    fn clear(&self) {
        *self.token.write() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_and_clear() {
        let store = InMemoryCredentials::new("secret");
        assert_eq!(store.load().as_deref(), Some("secret"));
        store.clear();
        assert!(store.load().is_none());
        store.set("fresh");
        assert_eq!(store.load().as_deref(), Some("fresh"));
    }

    #[test]
    fn test_empty() {
        assert!(InMemoryCredentials::empty().load().is_none());
    }
}
