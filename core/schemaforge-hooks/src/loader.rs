//! Discovers and loads the optional hook source of an entity directory.

use schemaforge_model::{CompiledEntity, EntityHooks, NoHooks};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::catalog::HookCatalog;
use crate::error::HookLoadError;
use crate::manifest::HookManifest;
use crate::rules::{HookChain, RuleHooks};

/// File name of the hook source inside an entity directory.
pub const HOOKS_FILE: &str = "hooks.toml";

/// A parsed hook source, not yet checked against its entity.
pub struct ExtensionUnit {
    source: PathBuf,
    manifest: HookManifest,
    handler: Option<Arc<dyn EntityHooks>>,
}

impl std::fmt::Debug for ExtensionUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionUnit")
            .field("source", &self.source)
            .field("manifest", &self.manifest)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

impl ExtensionUnit {
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn manifest(&self) -> &HookManifest {
        &self.manifest
    }

    /// True when the source declares neither rules nor a handler.
    pub fn is_empty(&self) -> bool {
        !self.manifest.has_rules() && self.handler.is_none()
    }

    /// Checks the rules against the compiled entity and produces the hooks
    /// to attach to its CRUD binding.
    ///
    /// Defaults must name create fields and pass their validation;
    /// immutable fields must exist.
    pub fn bind(&self, entity: &CompiledEntity) -> Result<Arc<dyn EntityHooks>, HookLoadError> {
        let invalid = |reason: String| HookLoadError::Invalid {
            path: self.source.clone(),
            reason,
        };

        for field in self.manifest.create.defaults.keys() {
            if entity.create_schema().field(field).is_none() {
                return Err(invalid(format!(
                    "default for unknown field '{field}' of {}",
                    entity.name()
                )));
            }
        }
        if !self.manifest.create.defaults.is_empty() {
            let defaults = Value::Object(self.manifest.create.defaults.clone());
            entity
                .update_schema()
                .validate(&defaults)
                .map_err(|e| invalid(format!("invalid default: {e}")))?;
        }
        for field in &self.manifest.update.immutable {
            if entity.create_schema().field(field).is_none() {
                return Err(invalid(format!(
                    "immutable field '{field}' is not a field of {}",
                    entity.name()
                )));
            }
        }

        let mut links: Vec<Arc<dyn EntityHooks>> = Vec::new();
        if self.manifest.has_rules() {
            links.push(Arc::new(RuleHooks::from_manifest(&self.manifest)));
        }
        if let Some(handler) = &self.handler {
            links.push(Arc::clone(handler));
        }
        Ok(match links.len() {
            0 => Arc::new(NoHooks),
            1 => links.remove(0),
            _ => Arc::new(HookChain::new(links)),
        })
    }
}

/// Loads `hooks.toml` files, resolving named handlers through a catalog.
#[derive(Clone, Default)]
pub struct HookLoader {
    catalog: HookCatalog,
}

impl HookLoader {
    pub fn new(catalog: HookCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &HookCatalog {
        &self.catalog
    }

    /// Loads the hook source of `dir`.
    ///
    /// Returns `Ok(None)` when the directory has no hook source. A source
    /// that exists but cannot be read, parsed, or resolved is an error.
    pub fn load(&self, dir: &Path) -> Result<Option<ExtensionUnit>, HookLoadError> {
        let path = dir.join(HOOKS_FILE);
        if !path.is_file() {
            return Ok(None);
        }

        let text = std::fs::read_to_string(&path).map_err(|source| HookLoadError::Io {
            path: path.clone(),
            source,
        })?;
        let manifest = HookManifest::from_toml(&text).map_err(|source| HookLoadError::Parse {
            path: path.clone(),
            source,
        })?;

        let handler = match &manifest.handler {
            Some(name) => Some(self.catalog.instantiate(name).ok_or_else(|| {
                HookLoadError::UnknownHandler {
                    path: path.clone(),
                    name: name.clone(),
                }
            })?),
            None => None,
        };

        debug!(source = %path.display(), handler = ?manifest.handler, "loaded hooks");
        Ok(Some(ExtensionUnit {
            source: path,
            manifest,
            handler,
        }))
    }
}
