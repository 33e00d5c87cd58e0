//! Bearer-token supply for backend requests.
//!
//! The app shell owns session storage; this core only reads tokens through
//! the [`TokenSource`] seam so it stays testable without a secure-storage
//! backend.

use async_trait::async_trait;

#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Current bearer token, or `None` when no session exists.
    async fn bearer_token(&self) -> Option<String>;
}

/// Fixed token source for tests and tooling.
pub struct StaticTokenSource {
    token: Option<String>,
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn absent() -> Self {
        Self { token: None }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn bearer_token(&self) -> Option<String> {
        self.token.clone()
    }
}
