use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

use crate::identity::Identity;
use crate::key::EntityKey;
use crate::record::Record;

/// The mutation a hook is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        })
    }
}

/// What a hook knows about the call it runs in.
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'a> {
    pub key: &'a EntityKey,
    pub operation: Operation,
    /// The caller, when the request carried valid credentials.
    pub identity: Option<&'a Identity>,
}

impl<'a> HookContext<'a> {
    pub fn new(key: &'a EntityKey, operation: Operation, identity: Option<&'a Identity>) -> Self {
        Self {
            key,
            operation,
            identity,
        }
    }
}

/// A hook failure. Any error aborts the operation and rolls it back.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HookError {
    /// The caller is not allowed to perform the operation.
    #[error("{0}")]
    Denied(String),

    /// The payload is acceptable to the shape but not to the hook.
    #[error("{0}")]
    Invalid(String),

    /// The hook itself failed.
    #[error("{0}")]
    Failed(String),
}

/// Lifecycle callbacks bound to one entity.
///
/// Every slot has a no-op default, so an implementation only overrides the
/// slots it cares about. The CRUD engine calls all slots unconditionally,
/// inside the storage transaction of the mutation: `before_*` runs before
/// the write, `after_*` after it but before the commit.
pub trait EntityHooks: Send + Sync {
    /// May amend the create payload as the caller sent it. The create shape
    /// is checked on the amended payload, so a hook can fill required
    /// fields the caller left out.
    fn before_create(
        &self,
        ctx: &HookContext<'_>,
        payload: &mut Map<String, Value>,
    ) -> Result<(), HookError> {
        let _ = (ctx, payload);
        Ok(())
    }

    fn after_create(&self, ctx: &HookContext<'_>, record: &Record) -> Result<(), HookError> {
        let _ = (ctx, record);
        Ok(())
    }

    /// May amend `changes`, the validated partial update about to be
    /// applied to `current`.
    fn before_update(
        &self,
        ctx: &HookContext<'_>,
        current: &Record,
        changes: &mut Map<String, Value>,
    ) -> Result<(), HookError> {
        let _ = (ctx, current, changes);
        Ok(())
    }

    fn after_update(&self, ctx: &HookContext<'_>, record: &Record) -> Result<(), HookError> {
        let _ = (ctx, record);
        Ok(())
    }

    fn before_delete(&self, ctx: &HookContext<'_>, record: &Record) -> Result<(), HookError> {
        let _ = (ctx, record);
        Ok(())
    }

    fn after_delete(&self, ctx: &HookContext<'_>, record: &Record) -> Result<(), HookError> {
        let _ = (ctx, record);
        Ok(())
    }
}

impl fmt::Debug for dyn EntityHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn EntityHooks")
    }
}

/// The hooks of an entity that has none.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl EntityHooks for NoHooks {}
