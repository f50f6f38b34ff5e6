//! Hook manifest (`hooks.toml`) found next to an entity description.
//!
//! ```toml
//! handler = "audit"
//!
//! [create]
//! defaults = { status = "Active" }
//! log = true
//!
//! [update]
//! immutable = ["email"]
//!
//! [delete]
//! require_role = "Admin"
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parsed `hooks.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HookManifest {
    /// Name of a native handler registered in the [`crate::HookCatalog`].
    #[serde(default)]
    pub handler: Option<String>,
    #[serde(default)]
    pub create: CreateRules,
    #[serde(default)]
    pub update: UpdateRules,
    #[serde(default)]
    pub delete: GuardRules,
}

/// Rules every operation understands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GuardRules {
    /// Reject the operation outright with this message.
    #[serde(default)]
    pub deny: Option<String>,
    /// Only callers with this role may perform the operation.
    #[serde(default)]
    pub require_role: Option<String>,
    /// Emit an info event after the mutation.
    #[serde(default)]
    pub log: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateRules {
    /// Values filled in when the payload leaves a field out or sets it null.
    #[serde(default)]
    pub defaults: Map<String, Value>,
    #[serde(default)]
    pub deny: Option<String>,
    #[serde(default)]
    pub require_role: Option<String>,
    #[serde(default)]
    pub log: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateRules {
    /// Fields that may not change once the record exists.
    #[serde(default)]
    pub immutable: Vec<String>,
    #[serde(default)]
    pub deny: Option<String>,
    #[serde(default)]
    pub require_role: Option<String>,
    #[serde(default)]
    pub log: bool,
}

impl CreateRules {
    pub(crate) fn guard(&self) -> GuardRules {
        GuardRules {
            deny: self.deny.clone(),
            require_role: self.require_role.clone(),
            log: self.log,
        }
    }
}

impl UpdateRules {
    pub(crate) fn guard(&self) -> GuardRules {
        GuardRules {
            deny: self.deny.clone(),
            require_role: self.require_role.clone(),
            log: self.log,
        }
    }
}

impl HookManifest {
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// True when the manifest declares no rule at all.
    pub fn has_rules(&self) -> bool {
        let guard_set = |g: &GuardRules| g.deny.is_some() || g.require_role.is_some() || g.log;
        !self.create.defaults.is_empty()
            || !self.update.immutable.is_empty()
            || guard_set(&self.create.guard())
            || guard_set(&self.update.guard())
            || guard_set(&self.delete)
    }
}
