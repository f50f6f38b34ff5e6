//! Lifecycle hook loader for schemaforge.
//!
//! An entity directory may carry a `hooks.toml` next to its description.
//! The loader turns it into an [`ExtensionUnit`]: declarative rules
//! (defaults, immutable fields, role requirements, denials, logging) plus an
//! optional native handler looked up by name in a [`HookCatalog`]. Binding
//! the unit to its compiled entity checks the rules and yields the
//! [`schemaforge_model::EntityHooks`] the CRUD engine calls.

mod catalog;
mod error;
mod loader;
mod manifest;
mod rules;

pub use catalog::{AuditHooks, HookCatalog};
pub use error::HookLoadError;
pub use loader::{ExtensionUnit, HookLoader, HOOKS_FILE};
pub use manifest::{CreateRules, GuardRules, HookManifest, UpdateRules};
pub use rules::{HookChain, RuleHooks};
