use schemaforge_model::{
    EntityHooks, EntityKey, HookContext, HookError, Identity, NoHooks, Operation, Record,
};
use serde_json::{json, Map, Value};
use uuid::Uuid;

fn key() -> EntityKey {
    EntityKey::new("crm", "customer").unwrap()
}

fn make_record(values: Value) -> Record {
    Record::new(Uuid::new_v4(), values.as_object().cloned().unwrap_or_default())
}

// ── Default implementations ──────────────────────────────────────

#[test]
fn no_hooks_accepts_everything() {
    let hooks = NoHooks;
    let key = key();
    let ctx = HookContext::new(&key, Operation::Create, None);
    let mut payload = Map::new();
    payload.insert("email".into(), json!("a@b.com"));

    assert!(hooks.before_create(&ctx, &mut payload).is_ok());
    assert_eq!(payload["email"], "a@b.com");

    let record = make_record(json!({"email": "a@b.com"}));
    assert!(hooks.after_create(&ctx, &record).is_ok());
    assert!(hooks.before_delete(&ctx, &record).is_ok());
    assert!(hooks.after_delete(&ctx, &record).is_ok());
}

#[test]
fn no_hooks_leaves_update_changes_untouched() {
    let hooks = NoHooks;
    let key = key();
    let ctx = HookContext::new(&key, Operation::Update, None);
    let current = make_record(json!({"status": "Active"}));
    let mut changes = Map::new();
    changes.insert("status".into(), json!("Inactive"));

    hooks.before_update(&ctx, &current, &mut changes).unwrap();
    assert_eq!(changes["status"], "Inactive");
    assert!(hooks.after_update(&ctx, &current).is_ok());
}

// ── Custom hook implementations ──────────────────────────────────

struct StampingHooks;
impl EntityHooks for StampingHooks {
    fn before_create(
        &self,
        ctx: &HookContext<'_>,
        payload: &mut Map<String, Value>,
    ) -> Result<(), HookError> {
        let owner = ctx
            .identity
            .map(|i| i.subject.clone())
            .unwrap_or_else(|| "anonymous".into());
        payload.insert("owner".into(), json!(owner));
        Ok(())
    }
}

#[test]
fn before_create_can_amend_payload() {
    let hooks = StampingHooks;
    let key = key();
    let admin = Identity::new("alice", "Admin");
    let ctx = HookContext::new(&key, Operation::Create, Some(&admin));
    let mut payload = Map::new();
    hooks.before_create(&ctx, &mut payload).unwrap();
    assert_eq!(payload["owner"], "alice");
}

#[test]
fn before_create_without_identity() {
    let hooks = StampingHooks;
    let key = key();
    let ctx = HookContext::new(&key, Operation::Create, None);
    let mut payload = Map::new();
    hooks.before_create(&ctx, &mut payload).unwrap();
    assert_eq!(payload["owner"], "anonymous");
}

struct AdminOnlyDelete;
impl EntityHooks for AdminOnlyDelete {
    fn before_delete(&self, ctx: &HookContext<'_>, _record: &Record) -> Result<(), HookError> {
        match ctx.identity {
            Some(i) if i.has_role("admin") => Ok(()),
            _ => Err(HookError::Denied("only admins may delete".into())),
        }
    }
}

#[test]
fn before_delete_can_deny() {
    let hooks = AdminOnlyDelete;
    let key = key();
    let user = Identity::new("bob", "User");
    let record = make_record(json!({}));

    let ctx = HookContext::new(&key, Operation::Delete, Some(&user));
    let err = hooks.before_delete(&ctx, &record).unwrap_err();
    assert_eq!(err, HookError::Denied("only admins may delete".into()));
    assert_eq!(err.to_string(), "only admins may delete");

    let admin = Identity::new("alice", "ADMIN");
    let ctx = HookContext::new(&key, Operation::Delete, Some(&admin));
    assert!(hooks.before_delete(&ctx, &record).is_ok());
}

// ── Trait object safety ──────────────────────────────────────────

#[test]
fn hooks_work_as_trait_objects() {
    let all: Vec<Box<dyn EntityHooks>> = vec![Box::new(NoHooks), Box::new(StampingHooks)];
    let key = key();
    let ctx = HookContext::new(&key, Operation::Create, None);
    for h in &all {
        let mut payload = Map::new();
        assert!(h.before_create(&ctx, &mut payload).is_ok());
    }
}

#[test]
fn operation_display() {
    assert_eq!(Operation::Create.to_string(), "create");
    assert_eq!(Operation::Update.to_string(), "update");
    assert_eq!(Operation::Delete.to_string(), "delete");
}
