use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ModelError, ModelResult};

/// Registry key of a compiled entity: `<namespace>.<entity>`, lowercased.
///
/// The namespace is the module directory and the entity is the submodule
/// directory the description was discovered in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    namespace: String,
    entity: String,
}

impl EntityKey {
    /// Builds a key. Segments are lowercased and must be non-empty ASCII
    /// alphanumerics, `_` or `-`.
    pub fn new(namespace: &str, entity: &str) -> ModelResult<Self> {
        Ok(Self {
            namespace: segment(namespace)?,
            entity: segment(entity)?,
        })
    }

    /// Parses the dotted `namespace.entity` form.
    pub fn parse(key: &str) -> ModelResult<Self> {
        let (namespace, entity) = key
            .split_once('.')
            .ok_or_else(|| ModelError::InvalidKey(key.to_string()))?;
        Self::new(namespace, entity)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// URL prefix the entity is served under, e.g. `/crm/customer`.
    pub fn route_prefix(&self) -> String {
        format!("/{}/{}", self.namespace, self.entity)
    }
}

fn segment(raw: &str) -> ModelResult<String> {
    let s = raw.trim().to_ascii_lowercase();
    let valid = !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(s)
    } else {
        Err(ModelError::InvalidKey(raw.to_string()))
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.entity)
    }
}
