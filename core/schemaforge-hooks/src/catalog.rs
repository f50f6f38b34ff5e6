//! Named native hook handlers that `hooks.toml` can refer to.

use schemaforge_model::{EntityHooks, HookContext, HookError, Record};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

type Factory = Arc<dyn Fn() -> Arc<dyn EntityHooks> + Send + Sync>;

/// Registry of hook handlers compiled into the binary.
///
/// A `hooks.toml` selects one with `handler = "<name>"`; each entity that
/// does so gets its own instance from the factory.
#[derive(Clone, Default)]
pub struct HookCatalog {
    factories: HashMap<String, Factory>,
}

impl HookCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog holding the handlers shipped with schemaforge
    /// (currently `"audit"`).
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        catalog.register("audit", || Arc::new(AuditHooks) as Arc<dyn EntityHooks>);
        catalog
    }

    /// Registers (or replaces) a handler factory.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Arc<dyn EntityHooks> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Arc::new(factory));
    }

    /// Instantiates the handler registered as `name`.
    pub fn instantiate(&self, name: &str) -> Option<Arc<dyn EntityHooks>> {
        self.factories.get(name).map(|factory| factory())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Logs every completed mutation together with the acting subject.
#[derive(Debug, Default)]
pub struct AuditHooks;

impl AuditHooks {
    fn record(&self, ctx: &HookContext<'_>, record: &Record) {
        info!(
            target: "schemaforge::audit",
            entity = %ctx.key,
            id = %record.id,
            operation = %ctx.operation,
            subject = ctx.identity.map(|i| i.subject.as_str()).unwrap_or("anonymous"),
            role = ctx.identity.map(|i| i.role.as_str()).unwrap_or(""),
            "audit"
        );
    }
}

impl EntityHooks for AuditHooks {
    fn after_create(&self, ctx: &HookContext<'_>, record: &Record) -> Result<(), HookError> {
        self.record(ctx, record);
        Ok(())
    }

    fn after_update(&self, ctx: &HookContext<'_>, record: &Record) -> Result<(), HookError> {
        self.record(ctx, record);
        Ok(())
    }

    fn after_delete(&self, ctx: &HookContext<'_>, record: &Record) -> Result<(), HookError> {
        self.record(ctx, record);
        Ok(())
    }
}
