use pretty_assertions::assert_eq;
use schemaforge_hooks::{HookCatalog, HookLoadError, HookLoader, HOOKS_FILE};
use schemaforge_model::{
    compile, CompiledEntity, EntityDescription, EntityHooks, EntityKey, HookContext, HookError,
    Identity, Operation, Record,
};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

// ── Helpers ──────────────────────────────────────────────────────

fn customer() -> CompiledEntity {
    let description = EntityDescription::from_value(json!({
        "name": "Customer",
        "fields": [
            {"fieldname": "customer_name", "fieldtype": "Data", "reqd": 1},
            {"fieldname": "email", "fieldtype": "Data", "reqd": 1},
            {"fieldname": "status", "fieldtype": "Select", "options": "Active\nInactive"}
        ]
    }))
    .unwrap();
    compile(&description).unwrap().entity
}

fn dir_with_hooks(text: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(HOOKS_FILE), text).unwrap();
    dir
}

fn key() -> EntityKey {
    EntityKey::new("crm", "customer").unwrap()
}

fn as_map(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

// ── Loading ──────────────────────────────────────────────────────

#[test]
fn directory_without_hooks_loads_nothing() {
    let dir = TempDir::new().unwrap();
    let loaded = HookLoader::default().load(dir.path()).unwrap();
    assert!(loaded.is_none());
}

#[test]
fn unparsable_hooks_is_an_error() {
    let dir = dir_with_hooks("[create\ndefaults = 1");
    let err = HookLoader::default().load(dir.path()).unwrap_err();
    assert!(matches!(err, HookLoadError::Parse { .. }));
}

#[test]
fn unknown_rule_is_a_parse_error() {
    let dir = dir_with_hooks("[create]\nvalidate = true\n");
    let err = HookLoader::default().load(dir.path()).unwrap_err();
    assert!(matches!(err, HookLoadError::Parse { .. }));
}

#[test]
fn unknown_handler_is_an_error() {
    let dir = dir_with_hooks("handler = \"missing\"\n");
    let err = HookLoader::new(HookCatalog::with_builtins())
        .load(dir.path())
        .unwrap_err();
    match err {
        HookLoadError::UnknownHandler { name, .. } => assert_eq!(name, "missing"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn builtin_audit_handler_resolves() {
    let dir = dir_with_hooks("handler = \"audit\"\n");
    let unit = HookLoader::new(HookCatalog::with_builtins())
        .load(dir.path())
        .unwrap()
        .unwrap();
    assert_eq!(unit.manifest().handler.as_deref(), Some("audit"));
    assert_eq!(unit.source(), dir.path().join(HOOKS_FILE));
    unit.bind(&customer()).unwrap();
}

#[test]
fn empty_hooks_file_binds_to_no_hooks() {
    let dir = dir_with_hooks("# nothing configured yet\n");
    let unit = HookLoader::default().load(dir.path()).unwrap().unwrap();
    assert!(unit.is_empty());

    let hooks = unit.bind(&customer()).unwrap();
    let key = key();
    let ctx = HookContext::new(&key, Operation::Create, None);
    let mut payload = as_map(json!({"email": "ada@x.io"}));
    hooks.before_create(&ctx, &mut payload).unwrap();
    assert_eq!(payload, as_map(json!({"email": "ada@x.io"})));
}

#[test]
fn handler_or_rules_make_a_unit_non_empty() {
    let dir = dir_with_hooks("handler = \"audit\"\n");
    let unit = HookLoader::new(HookCatalog::with_builtins())
        .load(dir.path())
        .unwrap()
        .unwrap();
    assert!(!unit.is_empty());

    let dir = dir_with_hooks("[delete]\ndeny = \"no\"\n");
    let unit = HookLoader::default().load(dir.path()).unwrap().unwrap();
    assert!(!unit.is_empty());
}

#[test]
fn default_for_required_field_binds() {
    let dir = dir_with_hooks("[create]\ndefaults = { email = \"x@y.com\" }\n");
    let hooks = HookLoader::default()
        .load(dir.path())
        .unwrap()
        .unwrap()
        .bind(&customer())
        .unwrap();
    let key = key();
    let ctx = HookContext::new(&key, Operation::Create, None);
    let mut payload = Map::new();
    hooks.before_create(&ctx, &mut payload).unwrap();
    assert_eq!(payload["email"], "x@y.com");
}

// ── Binding ──────────────────────────────────────────────────────

#[test]
fn default_for_unknown_field_fails_to_bind() {
    let dir = dir_with_hooks("[create]\ndefaults = { tier = \"gold\" }\n");
    let unit = HookLoader::default().load(dir.path()).unwrap().unwrap();
    let err = unit.bind(&customer()).unwrap_err();
    assert!(matches!(err, HookLoadError::Invalid { .. }));
    assert!(err.to_string().contains("tier"));
}

#[test]
fn default_outside_options_fails_to_bind() {
    let dir = dir_with_hooks("[create]\ndefaults = { status = \"Gone\" }\n");
    let unit = HookLoader::default().load(dir.path()).unwrap().unwrap();
    let err = unit.bind(&customer()).unwrap_err();
    assert!(err.to_string().contains("must be one of"));
}

#[test]
fn immutable_unknown_field_fails_to_bind() {
    let dir = dir_with_hooks("[update]\nimmutable = [\"tier\"]\n");
    let unit = HookLoader::default().load(dir.path()).unwrap().unwrap();
    assert!(unit.bind(&customer()).is_err());
}

// ── Rule behaviour ───────────────────────────────────────────────

#[test]
fn defaults_fill_missing_and_null_fields() {
    let dir = dir_with_hooks("[create]\ndefaults = { status = \"Active\" }\n");
    let hooks = HookLoader::default()
        .load(dir.path())
        .unwrap()
        .unwrap()
        .bind(&customer())
        .unwrap();
    let key = key();
    let ctx = HookContext::new(&key, Operation::Create, None);

    let mut missing = as_map(json!({"customer_name": "Ada", "email": "ada@x.io"}));
    hooks.before_create(&ctx, &mut missing).unwrap();
    assert_eq!(missing["status"], "Active");

    let mut null = as_map(json!({"customer_name": "Ada", "email": "ada@x.io", "status": null}));
    hooks.before_create(&ctx, &mut null).unwrap();
    assert_eq!(null["status"], "Active");

    let mut set = as_map(json!({"status": "Inactive"}));
    hooks.before_create(&ctx, &mut set).unwrap();
    assert_eq!(set["status"], "Inactive");
}

#[test]
fn require_role_checks_identity() {
    let dir = dir_with_hooks("[delete]\nrequire_role = \"Admin\"\n");
    let hooks = HookLoader::default()
        .load(dir.path())
        .unwrap()
        .unwrap()
        .bind(&customer())
        .unwrap();
    let key = key();
    let record = Record::new(Uuid::new_v4(), Map::new());

    let anonymous = HookContext::new(&key, Operation::Delete, None);
    assert!(matches!(
        hooks.before_delete(&anonymous, &record),
        Err(HookError::Denied(_))
    ));

    let user = Identity::new("bob", "User");
    let ctx = HookContext::new(&key, Operation::Delete, Some(&user));
    let err = hooks.before_delete(&ctx, &record).unwrap_err();
    assert_eq!(err.to_string(), "delete on crm.customer requires role 'Admin'");

    let admin = Identity::new("alice", "admin");
    let ctx = HookContext::new(&key, Operation::Delete, Some(&admin));
    hooks.before_delete(&ctx, &record).unwrap();
}

#[test]
fn deny_rejects_operation() {
    let dir = dir_with_hooks("[create]\ndeny = \"closed for business\"\n");
    let hooks = HookLoader::default()
        .load(dir.path())
        .unwrap()
        .unwrap()
        .bind(&customer())
        .unwrap();
    let key = key();
    let ctx = HookContext::new(&key, Operation::Create, None);
    let err = hooks.before_create(&ctx, &mut Map::new()).unwrap_err();
    assert_eq!(err, HookError::Denied("closed for business".into()));
}

#[test]
fn immutable_field_cannot_change() {
    let dir = dir_with_hooks("[update]\nimmutable = [\"email\"]\n");
    let hooks = HookLoader::default()
        .load(dir.path())
        .unwrap()
        .unwrap()
        .bind(&customer())
        .unwrap();
    let key = key();
    let ctx = HookContext::new(&key, Operation::Update, None);
    let current = Record::new(Uuid::new_v4(), as_map(json!({"email": "a@x.io"})));

    let mut same = as_map(json!({"email": "a@x.io"}));
    hooks.before_update(&ctx, &current, &mut same).unwrap();

    let mut unrelated = as_map(json!({"status": "Inactive"}));
    hooks.before_update(&ctx, &current, &mut unrelated).unwrap();

    let mut changed = as_map(json!({"email": "b@x.io"}));
    let err = hooks.before_update(&ctx, &current, &mut changed).unwrap_err();
    assert!(matches!(err, HookError::Invalid(_)));
}

// ── Handlers ─────────────────────────────────────────────────────

#[derive(Default)]
struct Counting {
    creates: Arc<AtomicUsize>,
}

impl EntityHooks for Counting {
    fn before_create(
        &self,
        _ctx: &HookContext<'_>,
        payload: &mut Map<String, Value>,
    ) -> Result<(), HookError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        // Runs after the declarative defaults.
        assert_eq!(payload.get("status"), Some(&json!("Active")));
        Ok(())
    }
}

#[test]
fn rules_run_before_named_handler() {
    let creates = Arc::new(AtomicUsize::new(0));
    let mut catalog = HookCatalog::new();
    let shared = Arc::clone(&creates);
    catalog.register("counting", move || {
        Arc::new(Counting {
            creates: Arc::clone(&shared),
        }) as Arc<dyn EntityHooks>
    });
    assert_eq!(catalog.names(), vec!["counting"]);

    let dir = dir_with_hooks("handler = \"counting\"\n[create]\ndefaults = { status = \"Active\" }\n");
    let hooks = HookLoader::new(catalog)
        .load(dir.path())
        .unwrap()
        .unwrap()
        .bind(&customer())
        .unwrap();

    let key = key();
    let ctx = HookContext::new(&key, Operation::Create, None);
    hooks.before_create(&ctx, &mut Map::new()).unwrap();
    assert_eq!(creates.load(Ordering::SeqCst), 1);
}
