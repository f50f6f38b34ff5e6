//! The CRUD binding of one entity.

use schemaforge_model::{
    EntityHooks, EntityKey, HookContext, Identity, NoHooks, Operation, Record, RegistryEntry,
    ValidationErrors,
};
use schemaforge_storage::{Session, Tx};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::error::{CrudError, CrudResult};

/// Page size used when a list request does not name one.
pub const DEFAULT_PAGE_LIMIT: u64 = 100;

/// Window of a list request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub skip: u64,
    pub limit: u64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl Page {
    pub fn new(skip: u64, limit: u64) -> Self {
        Self { skip, limit }
    }
}

/// Serves list/get/create/update/delete for one compiled entity.
///
/// Every operation runs against a caller-supplied [`Session`] and returns
/// records translated through the entity's read shape. Mutations run in a
/// single transaction that also spans the `before_*` and `after_*` hooks,
/// so a hook error leaves storage untouched.
#[derive(Clone)]
pub struct CrudBinding {
    entry: RegistryEntry,
    hooks: Arc<dyn EntityHooks>,
}

impl std::fmt::Debug for CrudBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrudBinding")
            .field("key", self.entry.key())
            .finish_non_exhaustive()
    }
}

impl CrudBinding {
    /// A binding without hooks.
    pub fn new(entry: RegistryEntry) -> Self {
        Self::with_hooks(entry, Arc::new(NoHooks))
    }

    pub fn with_hooks(entry: RegistryEntry, hooks: Arc<dyn EntityHooks>) -> Self {
        Self { entry, hooks }
    }

    pub fn key(&self) -> &EntityKey {
        self.entry.key()
    }

    pub fn entry(&self) -> &RegistryEntry {
        &self.entry
    }

    /// Up to `page.limit` records after skipping `page.skip`, in insertion
    /// order. An empty table yields an empty list.
    pub fn list(&self, session: &mut Session<'_>, page: Page) -> CrudResult<Vec<Value>> {
        let tx = session.transaction()?;
        let records = tx.scan(&self.entry, page.skip, page.limit)?;
        records.iter().map(|r| self.translate(r)).collect()
    }

    pub fn get(&self, session: &mut Session<'_>, id: &str) -> CrudResult<Value> {
        let uuid = self.parse_id(id)?;
        let tx = session.transaction()?;
        let record = self.fetch_existing(&tx, uuid, id)?;
        self.translate(&record)
    }

    /// Runs `before_create` on `payload`, validates the result against the
    /// create shape, assigns an identifier and persists the record. Returns the stored record, not the input.
    pub fn create(
        &self,
        session: &mut Session<'_>,
        identity: Option<&Identity>,
        payload: &Value,
    ) -> CrudResult<Value> {
        let schema = self.entry.create_schema();
        let mut values = payload
            .as_object()
            .cloned()
            .ok_or_else(|| ValidationErrors::single("", "expected a JSON object"))?;

        let tx = session.write_transaction()?;
        let ctx = HookContext::new(self.key(), Operation::Create, identity);
        // Hooks may fill fields the caller left out.
        self.hooks.before_create(&ctx, &mut values)?;
        let values = schema.validate(&Value::Object(values))?;

        let id = Uuid::new_v4();
        tx.insert(&self.entry, id, &values)?;
        let record = self.fetch_existing(&tx, id, &id.to_string())?;
        self.hooks.after_create(&ctx, &record)?;
        let out = self.translate(&record)?;
        tx.commit()?;

        debug!(entity = %self.key(), %id, "created record");
        Ok(out)
    }

    /// Applies a partial update. Fields left out of `payload` keep their
    /// stored value.
    pub fn update(
        &self,
        session: &mut Session<'_>,
        identity: Option<&Identity>,
        id: &str,
        payload: &Value,
    ) -> CrudResult<Value> {
        let uuid = self.parse_id(id)?;
        let schema = self.entry.update_schema();
        let mut changes = schema.validate(payload)?;

        let tx = session.write_transaction()?;
        let current = self.fetch_existing(&tx, uuid, id)?;
        let ctx = HookContext::new(self.key(), Operation::Update, identity);
        self.hooks.before_update(&ctx, &current, &mut changes)?;
        let changes = schema.validate(&Value::Object(changes))?;

        if !tx.update(&self.entry, uuid, &changes)? {
            return Err(self.not_found(id));
        }
        let record = self.fetch_existing(&tx, uuid, id)?;
        self.hooks.after_update(&ctx, &record)?;
        let out = self.translate(&record)?;
        tx.commit()?;

        debug!(entity = %self.key(), id = %uuid, fields = changes.len(), "updated record");
        Ok(out)
    }

    /// Removes a record and returns its last stored state.
    pub fn delete(
        &self,
        session: &mut Session<'_>,
        identity: Option<&Identity>,
        id: &str,
    ) -> CrudResult<Value> {
        let uuid = self.parse_id(id)?;
        let tx = session.write_transaction()?;
        let current = self.fetch_existing(&tx, uuid, id)?;
        let out = self.translate(&current)?;

        let ctx = HookContext::new(self.key(), Operation::Delete, identity);
        self.hooks.before_delete(&ctx, &current)?;
        if !tx.delete(&self.entry, uuid)? {
            return Err(self.not_found(id));
        }
        self.hooks.after_delete(&ctx, &current)?;
        tx.commit()?;

        debug!(entity = %self.key(), id = %uuid, "deleted record");
        Ok(out)
    }

    fn parse_id(&self, id: &str) -> CrudResult<Uuid> {
        Uuid::parse_str(id).map_err(|_| self.not_found(id))
    }

    fn fetch_existing(&self, tx: &Tx<'_>, uuid: Uuid, id: &str) -> CrudResult<Record> {
        tx.fetch(&self.entry, uuid)?.ok_or_else(|| self.not_found(id))
    }

    fn not_found(&self, id: &str) -> CrudError {
        CrudError::NotFound {
            key: self.key().clone(),
            id: id.to_string(),
        }
    }

    /// Stored record → read shape. A record the read shape rejects means the
    /// stored data drifted away from the compiled entity.
    fn translate(&self, record: &Record) -> CrudResult<Value> {
        self.entry
            .read_schema()
            .validate(&record.to_json())
            .map(Value::Object)
            .map_err(|errors| {
                CrudError::SchemaMismatch(format!("{} record {}: {errors}", self.key(), record.id))
            })
    }
}
