use std::sync::{Arc, RwLock};

/// Bearer token shared by every clone of the API client.
///
/// The client clears it when the server answers 401, so all holders see the
/// logout at once.
#[derive(Debug, Clone, Default)]
pub struct TokenStore {
    inner: Arc<RwLock<Option<String>>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<String> {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set(&self, token: impl Into<String>) {
        *self.inner.write().unwrap_or_else(|e| e.into_inner()) = Some(token.into());
    }

    /// Remove the token. Returns true if one was present.
    pub fn clear(&self) -> bool {
        self.inner.write().unwrap_or_else(|e| e.into_inner()).take().is_some()
    }

    pub fn is_set(&self) -> bool {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).is_some()
    }
}
