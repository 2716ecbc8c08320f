//! Secure credential handling for completion providers.
//!
//! Using [`ApiCredential`] ensures:
//!
//! - **No accidental logging**: Credentials cannot appear in Debug/Display output
//! - **Memory safety**: Credentials are zeroed on drop
//! - **Explicit exposure**: The raw value is only reachable through `.expose()`
//!
//! ## Usage
//!
//! ```ignore
//! use sift_runtime::providers::{ApiCredential, GROQ_API_KEY_ENV, GROQ_API_ENV};
//!
//! // First variable that is set wins
//! let lookup = |var: &str| std::env::var(var).ok();
//! let cred = ApiCredential::from_lookup(&[GROQ_API_KEY_ENV, GROQ_API_ENV], "Groq API key", lookup)?;
//!
//! request.bearer_auth(cred.expose());
//! ```

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

use super::CompletionError;

/// Primary environment variable for the Groq API key.
pub const GROQ_API_KEY_ENV: &str = "GROQ_API_KEY";

/// Legacy environment variable consulted when [`GROQ_API_KEY_ENV`] is unset.
pub const GROQ_API_ENV: &str = "GROQ_API";

/// Where a credential was loaded from.
///
/// Useful for debugging configuration issues without exposing the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Loaded from the YAML configuration file
    Config,
    /// Loaded from an environment variable
    Environment,
    /// Passed as a command line flag
    CommandLine,
    /// Provided programmatically
    Programmatic,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Config => write!(f, "config"),
            CredentialSource::Environment => write!(f, "environment"),
            CredentialSource::CommandLine => write!(f, "command line"),
            CredentialSource::Programmatic => write!(f, "programmatic"),
        }
    }
}

/// A securely-stored API credential.
///
/// # Example
///
/// ```ignore
/// let cred = ApiCredential::new("gsk-secret", CredentialSource::Environment, "Groq API key");
///
/// // Safe to log - shows [REDACTED]
/// tracing::debug!(credential = %cred, "Loaded credential");
///
/// let key = cred.expose();
/// ```
pub struct ApiCredential {
    value: SecretString,
    source: CredentialSource,
    name: &'static str,
}

impl ApiCredential {
    /// Create a new credential from a string value.
    pub fn new(value: impl Into<String>, source: CredentialSource, name: &'static str) -> Self {
        Self {
            value: SecretString::from(value.into()),
            source,
            name,
        }
    }

    /// Load a credential from the first non-empty variable in `env_vars`,
    /// resolved through `lookup`.
    pub fn from_lookup(
        env_vars: &[&str],
        name: &'static str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, CompletionError> {
        env_vars
            .iter()
            .find_map(|var| lookup(var).filter(|v| !v.trim().is_empty()))
            .map(|v| Self::new(v.trim(), CredentialSource::Environment, name))
            .ok_or_else(|| {
                CompletionError::NotConfigured(format!(
                    "{} not set: configure one of {} environment variables",
                    name,
                    env_vars.join(", ")
                ))
            })
    }

    /// Expose the credential value for use in API calls.
    ///
    /// Only call this where the credential is actually needed. Never store
    /// the exposed value.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    /// Check if the credential is empty.
    pub fn is_empty(&self) -> bool {
        self.value.expose_secret().is_empty()
    }

    /// Get the source of this credential.
    pub fn source(&self) -> CredentialSource {
        self.source
    }

    /// Get the human-readable name of this credential.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Clone for ApiCredential {
    fn clone(&self) -> Self {
        Self::new(self.expose(), self.source, self.name)
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {} [REDACTED]", self.name, self.source)
    }
}
