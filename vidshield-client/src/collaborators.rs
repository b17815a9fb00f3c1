//! External collaborators the client depends on
//!
//! - [`Navigator`] - route changes (redirect on completion/error)
//! - [`TokenProvider`] - bearer credential for stream and API calls
//! - [`ViolationsApi`] - paginated violation records for review prefetch
//!
//! All are injected so the client can be driven without a UI or network.

use crate::error::ClientResult;
use crate::prefetch::ViolationPage;
use async_trait::async_trait;

/// Router/navigation service
pub trait Navigator: Send + Sync {
    /// Open `route` (e.g. `/review/vid1`)
    fn navigate(&self, route: &str);
}

/// Source of the bearer credential
pub trait TokenProvider: Send + Sync {
    /// Current token, `None` when unauthenticated
    fn token(&self) -> Option<String>;
}

/// Fixed token, e.g. from the command line
#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: Option<String>) -> Self {
        Self(token.filter(|t| !t.trim().is_empty()))
    }
}

impl TokenProvider for StaticToken {
    fn token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Violations list endpoint
#[async_trait]
pub trait ViolationsApi: Send + Sync {
    /// Fetch the violation records recorded for a job
    async fn list_violations(&self, job_id: &str) -> ClientResult<ViolationPage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_static_token_is_none() {
        assert_eq!(StaticToken::new(Some("  ".to_string())).token(), None);
        assert_eq!(StaticToken::new(None).token(), None);
        assert_eq!(
            StaticToken::new(Some("abc".to_string())).token().as_deref(),
            Some("abc")
        );
    }
}
