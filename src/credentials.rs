use std::fmt;

use crate::error::NovaFetchError;

/// Environment variable holding the nova.astrometry.net API key.
pub const TOKEN_VARIABLE: &str = "novatoken";

/// The API key, resolved once at process start.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
}

impl Credentials {
    /// Reads the API key from [`TOKEN_VARIABLE`]. Missing or empty is fatal.
    pub fn from_env() -> Result<Self, NovaFetchError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, NovaFetchError> {
        match lookup(TOKEN_VARIABLE) {
            Some(key) if !key.trim().is_empty() => Ok(Self::new(key.trim())),
            _ => Err(NovaFetchError::MissingToken(TOKEN_VARIABLE)),
        }
    }

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

// Keep the key out of logs and panics.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Session id returned by a successful login.
///
/// Produced exactly once per run and passed by reference to authenticated calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session(String);

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
