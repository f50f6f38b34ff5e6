//! Caller identity as issued by the credential collaborator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The claims carried by a verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub subject: String,
    pub role: String,
}

impl Identity {
    pub fn new(subject: &str, role: &str) -> Self {
        Self {
            subject: subject.into(),
            role: role.into(),
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.role.eq_ignore_ascii_case(role)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing credentials")]
    MissingCredentials,

    #[error("could not validate credentials")]
    InvalidCredentials,
}

/// Turns request credentials into an [`Identity`].
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, token: &str) -> Result<Identity, AuthError>;
}
