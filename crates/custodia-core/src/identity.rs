//! Operator identity resolution.
//!
//! Every mutating operation is attributed to an operator id. The engine
//! resolves ids through a directory before recording anything, so an
//! unknown operator fails the request instead of landing in the ledger.
//! Roles gate the administrative operations; ordinary custody recording
//! needs no particular role.

use std::collections::HashMap;

use thiserror::Error;

/// Errors from resolving an operator id.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IdentityError {
    /// The operator id is not known to the directory.
    #[error("unknown operator: {actor_id}")]
    UnknownActor {
        /// The id that failed to resolve.
        actor_id: String,
    },

    /// The directory could not be reached. Retryable.
    #[error("identity directory unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },
}

/// A resolved operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUser {
    /// The operator id as recorded in ledger rows.
    pub id: String,

    /// The operator's role, used for administrative permission checks.
    pub role: String,
}

/// Trait for operator directories.
pub trait IdentityDirectory: Send + Sync {
    /// Resolves an operator id to a user.
    ///
    /// # Errors
    ///
    /// - [`IdentityError::UnknownActor`] if the id does not resolve
    /// - [`IdentityError::Unavailable`] if the directory cannot be reached
    fn resolve_user(&self, actor_id: &str) -> Result<ResolvedUser, IdentityError>;
}

/// Directory backed by a fixed in-memory table.
///
/// Holds explicitly listed operators with their roles, plus an optional
/// default role under which any other id resolves. With no default role,
/// unlisted ids fail to resolve.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    actors: HashMap<String, String>,
    default_role: Option<String>,
}

impl StaticDirectory {
    /// Creates an empty directory that resolves nobody.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a directory from an id-to-role table.
    #[must_use]
    pub fn from_table(actors: HashMap<String, String>) -> Self {
        Self {
            actors,
            default_role: None,
        }
    }

    /// Adds an operator with an explicit role.
    #[must_use]
    pub fn with_actor(mut self, actor_id: impl Into<String>, role: impl Into<String>) -> Self {
        self.actors.insert(actor_id.into(), role.into());
        self
    }

    /// Sets the role granted to ids not listed explicitly.
    #[must_use]
    pub fn with_default_role(mut self, role: impl Into<String>) -> Self {
        self.default_role = Some(role.into());
        self
    }
}

impl IdentityDirectory for StaticDirectory {
    fn resolve_user(&self, actor_id: &str) -> Result<ResolvedUser, IdentityError> {
        if let Some(role) = self.actors.get(actor_id) {
            return Ok(ResolvedUser {
                id: actor_id.to_string(),
                role: role.clone(),
            });
        }

        match &self.default_role {
            Some(role) => Ok(ResolvedUser {
                id: actor_id.to_string(),
                role: role.clone(),
            }),
            None => Err(IdentityError::UnknownActor {
                actor_id: actor_id.to_string(),
            }),
        }
    }
}
