//! Declarative hooks built from a [`HookManifest`].

use schemaforge_model::{EntityHooks, HookContext, HookError, Record};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

use crate::manifest::{GuardRules, HookManifest};

/// Hooks that enforce the rules of a `hooks.toml`.
#[derive(Debug, Clone)]
pub struct RuleHooks {
    defaults: Map<String, Value>,
    immutable: Vec<String>,
    create: GuardRules,
    update: GuardRules,
    delete: GuardRules,
}

impl RuleHooks {
    pub fn from_manifest(manifest: &HookManifest) -> Self {
        Self {
            defaults: manifest.create.defaults.clone(),
            immutable: manifest.update.immutable.clone(),
            create: manifest.create.guard(),
            update: manifest.update.guard(),
            delete: manifest.delete.clone(),
        }
    }
}

fn check_guard(rules: &GuardRules, ctx: &HookContext<'_>) -> Result<(), HookError> {
    if let Some(message) = &rules.deny {
        return Err(HookError::Denied(message.clone()));
    }
    if let Some(role) = &rules.require_role {
        let allowed = ctx.identity.is_some_and(|i| i.has_role(role));
        if !allowed {
            return Err(HookError::Denied(format!(
                "{} on {} requires role '{role}'",
                ctx.operation, ctx.key
            )));
        }
    }
    Ok(())
}

fn log_mutation(rules: &GuardRules, ctx: &HookContext<'_>, record: &Record) {
    if rules.log {
        let subject = ctx.identity.map(|i| i.subject.as_str()).unwrap_or("anonymous");
        info!(
            entity = %ctx.key,
            id = %record.id,
            operation = %ctx.operation,
            subject,
            "record mutated"
        );
    }
}

impl EntityHooks for RuleHooks {
    fn before_create(
        &self,
        ctx: &HookContext<'_>,
        payload: &mut Map<String, Value>,
    ) -> Result<(), HookError> {
        check_guard(&self.create, ctx)?;
        for (field, value) in &self.defaults {
            let slot = payload.entry(field.clone()).or_insert(Value::Null);
            if slot.is_null() {
                *slot = value.clone();
            }
        }
        Ok(())
    }

    fn after_create(&self, ctx: &HookContext<'_>, record: &Record) -> Result<(), HookError> {
        log_mutation(&self.create, ctx, record);
        Ok(())
    }

    fn before_update(
        &self,
        ctx: &HookContext<'_>,
        current: &Record,
        changes: &mut Map<String, Value>,
    ) -> Result<(), HookError> {
        check_guard(&self.update, ctx)?;
        for field in &self.immutable {
            if let Some(new) = changes.get(field) {
                if current.get(field).unwrap_or(&Value::Null) != new {
                    return Err(HookError::Invalid(format!("field '{field}' cannot be changed")));
                }
            }
        }
        Ok(())
    }

    fn after_update(&self, ctx: &HookContext<'_>, record: &Record) -> Result<(), HookError> {
        log_mutation(&self.update, ctx, record);
        Ok(())
    }

    fn before_delete(&self, ctx: &HookContext<'_>, _record: &Record) -> Result<(), HookError> {
        check_guard(&self.delete, ctx)
    }

    fn after_delete(&self, ctx: &HookContext<'_>, record: &Record) -> Result<(), HookError> {
        log_mutation(&self.delete, ctx, record);
        Ok(())
    }
}

/// Runs several hook sets in order; the first error stops the chain.
#[derive(Clone, Default)]
pub struct HookChain {
    links: Vec<Arc<dyn EntityHooks>>,
}

impl HookChain {
    pub fn new(links: Vec<Arc<dyn EntityHooks>>) -> Self {
        Self { links }
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

impl EntityHooks for HookChain {
    fn before_create(
        &self,
        ctx: &HookContext<'_>,
        payload: &mut Map<String, Value>,
    ) -> Result<(), HookError> {
        self.links.iter().try_for_each(|h| h.before_create(ctx, payload))
    }

    fn after_create(&self, ctx: &HookContext<'_>, record: &Record) -> Result<(), HookError> {
        self.links.iter().try_for_each(|h| h.after_create(ctx, record))
    }

    fn before_update(
        &self,
        ctx: &HookContext<'_>,
        current: &Record,
        changes: &mut Map<String, Value>,
    ) -> Result<(), HookError> {
        self.links
            .iter()
            .try_for_each(|h| h.before_update(ctx, current, changes))
    }

    fn after_update(&self, ctx: &HookContext<'_>, record: &Record) -> Result<(), HookError> {
        self.links.iter().try_for_each(|h| h.after_update(ctx, record))
    }

    fn before_delete(&self, ctx: &HookContext<'_>, record: &Record) -> Result<(), HookError> {
        self.links.iter().try_for_each(|h| h.before_delete(ctx, record))
    }

    fn after_delete(&self, ctx: &HookContext<'_>, record: &Record) -> Result<(), HookError> {
        self.links.iter().try_for_each(|h| h.after_delete(ctx, record))
    }
}
