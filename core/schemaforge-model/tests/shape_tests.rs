use pretty_assertions::assert_eq;
use schemaforge_model::{compile, CompiledEntity, EntityDescription, ShapeVariant};
use serde_json::json;

fn compile_json(value: serde_json::Value) -> CompiledEntity {
    let desc = EntityDescription::from_value(value).unwrap();
    compile(&desc).unwrap().entity
}

fn contact() -> CompiledEntity {
    compile_json(json!({
        "name": "Contact",
        "fields": [
            {"fieldname": "email", "fieldtype": "Email", "reqd": 1},
            {"fieldname": "age", "fieldtype": "Int"},
            {"fieldname": "score", "fieldtype": "Float"},
            {"fieldname": "vip", "fieldtype": "Check"},
            {"fieldname": "birthday", "fieldtype": "Date"},
            {"fieldname": "status", "fieldtype": "Select", "options": "Active\nInactive"}
        ]
    }))
}

// ── Create variant ───────────────────────────────────────────────

#[test]
fn create_fills_missing_optionals_with_null() {
    let c = contact();
    let out = c.create_schema().validate(&json!({"email": "a@b.com"})).unwrap();
    assert_eq!(out["email"], "a@b.com");
    for f in ["age", "score", "vip", "birthday", "status"] {
        assert!(out[f].is_null(), "{f} should be null");
    }
}

#[test]
fn create_requires_required_fields() {
    let c = contact();
    let err = c.create_schema().validate(&json!({})).unwrap_err();
    assert!(err.has_field("email"));
    assert_eq!(err.errors().len(), 1);
    assert_eq!(err.to_string(), "email: field required");
}

#[test]
fn create_rejects_null_for_required() {
    let c = contact();
    let err = c.create_schema().validate(&json!({"email": null})).unwrap_err();
    assert_eq!(err.errors()[0].message, "field cannot be null");
}

#[test]
fn create_ignores_id_and_unknown_keys() {
    let c = contact();
    let out = c
        .create_schema()
        .validate(&json!({"email": "a@b.com", "id": "x", "nickname": "zed"}))
        .unwrap();
    assert!(!out.contains_key("id"));
    assert!(!out.contains_key("nickname"));
}

#[test]
fn create_rejects_non_object() {
    let c = contact();
    let err = c.create_schema().validate(&json!([1, 2])).unwrap_err();
    assert_eq!(err.to_string(), "expected a JSON object");
}

#[test]
fn create_reports_every_bad_field() {
    let c = contact();
    let err = c
        .create_schema()
        .validate(&json!({
            "email": "not-an-email",
            "age": 3.5,
            "score": "high",
            "vip": "yes",
            "birthday": "12/01/2020",
            "status": "Gone"
        }))
        .unwrap_err();
    let fields: Vec<&str> = err.errors().iter().map(|e| e.field.as_str()).collect();
    assert_eq!(fields, vec!["email", "age", "score", "vip", "birthday", "status"]);
}

#[test]
fn create_accepts_well_typed_values() {
    let c = contact();
    let out = c
        .create_schema()
        .validate(&json!({
            "email": "a@b.com",
            "age": 41,
            "score": 7,
            "vip": true,
            "birthday": "1984-02-29",
            "status": "Active"
        }))
        .unwrap();
    assert_eq!(out["age"], 41);
    assert_eq!(out["score"], 7.0);
    assert_eq!(out["vip"], true);
    assert_eq!(out["birthday"], "1984-02-29");
    assert_eq!(out["status"], "Active");
}

#[test]
fn select_options_message_lists_choices() {
    let c = contact();
    let err = c
        .create_schema()
        .validate(&json!({"email": "a@b.com", "status": "Gone"}))
        .unwrap_err();
    assert_eq!(err.errors()[0].message, "must be one of: Active, Inactive");
}

#[test]
fn invalid_calendar_date_rejected() {
    let c = contact();
    let err = c
        .create_schema()
        .validate(&json!({"email": "a@b.com", "birthday": "2023-02-30"}))
        .unwrap_err();
    assert!(err.has_field("birthday"));
}

// ── Read variant ─────────────────────────────────────────────────

#[test]
fn read_requires_identifier() {
    let c = contact();
    let err = c.read_schema().validate(&json!({"email": "a@b.com"})).unwrap_err();
    assert!(err.has_field("id"));
}

#[test]
fn read_canonicalizes_identifier() {
    let c = contact();
    let out = c
        .read_schema()
        .validate(&json!({"id": "67E55044-10B1-426F-9247-BB680E5FE0C8", "email": "a@b.com"}))
        .unwrap();
    assert_eq!(out["id"], "67e55044-10b1-426f-9247-bb680e5fe0c8");
}

#[test]
fn read_rejects_malformed_identifier() {
    let c = contact();
    let err = c
        .read_schema()
        .validate(&json!({"id": "nope", "email": "a@b.com"}))
        .unwrap_err();
    assert_eq!(err.errors()[0].message, "invalid UUID");
}

// ── Update variant ───────────────────────────────────────────────

#[test]
fn update_accepts_partial_payload() {
    let c = contact();
    let out = c.update_schema().validate(&json!({"age": 12})).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out["age"], 12);
}

#[test]
fn update_accepts_empty_payload() {
    let c = contact();
    let out = c.update_schema().validate(&json!({})).unwrap();
    assert!(out.is_empty());
}

#[test]
fn update_allows_clearing_optional_field() {
    let c = contact();
    let out = c.update_schema().validate(&json!({"status": null})).unwrap();
    assert!(out["status"].is_null());
}

#[test]
fn update_rejects_clearing_required_field() {
    let c = contact();
    let err = c.update_schema().validate(&json!({"email": null})).unwrap_err();
    assert!(err.has_field("email"));
}

#[test]
fn update_type_checks_present_fields() {
    let c = contact();
    let err = c.update_schema().validate(&json!({"vip": 1})).unwrap_err();
    assert_eq!(err.errors()[0].message, "expected a boolean");
}

// ── Variants ─────────────────────────────────────────────────────

#[test]
fn variants_are_tagged() {
    let c = contact();
    assert_eq!(c.create_schema().variant(), ShapeVariant::Create);
    assert_eq!(c.read_schema().variant(), ShapeVariant::Read);
    assert_eq!(c.update_schema().variant(), ShapeVariant::Update);
}

#[test]
fn shapes_serialize_for_introspection() {
    let c = compile_json(json!({
        "name": "Tag",
        "fields": [{"fieldname": "label", "fieldtype": "Data", "reqd": 1}]
    }));
    let v = serde_json::to_value(c.create_schema()).unwrap();
    assert_eq!(
        v,
        json!({
            "variant": "create",
            "fields": [{"name": "label", "kind": "string", "optional": false}]
        })
    );
}
