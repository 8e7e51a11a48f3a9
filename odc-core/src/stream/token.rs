//! Credential access for the event stream.
//!
//! The stream client reads the token, it never owns it: the provider is
//! consulted again on every reconnect attempt so a credential rotation
//! or logout takes effect without a stale connection persisting.

use std::sync::{Arc, RwLock};

/// Source of the bearer token used to open a stream connection.
pub trait TokenProvider: Send + Sync + 'static {
    /// The current token, or `None` when the caller is logged out.
    fn token(&self) -> Option<String>;
}

/// A fixed token, for tools that receive their credential up front.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl TokenProvider for StaticToken {
    fn token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Reads the token from an environment variable on every call.
#[derive(Debug, Clone)]
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl TokenProvider for EnvToken {
    fn token(&self) -> Option<String> {
        std::env::var(&self.var).ok()
    }
}

/// A shared, swappable token for interactive sessions: set on login,
/// cleared on logout. Cloning shares the underlying slot.
#[derive(Debug, Clone, Default)]
pub struct SharedToken {
    slot: Arc<RwLock<Option<String>>>,
}

impl SharedToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            slot: Arc::new(RwLock::new(Some(token.into()))),
        }
    }

    /// An empty slot; the stream client treats it as logged out.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn set(&self, token: impl Into<String>) {
        if let Ok(mut guard) = self.slot.write() {
            *guard = Some(token.into());
        }
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.slot.write() {
            *guard = None;
        }
    }
}

impl TokenProvider for SharedToken {
    fn token(&self) -> Option<String> {
        self.slot.read().ok().and_then(|guard| guard.clone())
    }
}
