//! Provenance of administrative changes.
//!
//! Every prepare, commit and rollback records which host and user issued it.
//! The values are handed to the coordinator explicitly; nothing in the change
//! path reads the process environment on its own.


use serde::Deserialize;
use serde::Serialize;

/// Host and user an operator is issuing changes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEnvironment {
    pub host: String,
    pub user: String,
}

impl ChangeEnvironment {
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
        }
    }

    /// Reads `HOSTNAME` and `USER`, falling back to `localhost` and `unknown`
    pub fn from_env() -> Self {
        let host = non_empty_var("HOSTNAME").unwrap_or_else(|| "localhost".to_string());
        let user = non_empty_var("USER").unwrap_or_else(|| "unknown".to_string());
        Self::new(host, user)
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
