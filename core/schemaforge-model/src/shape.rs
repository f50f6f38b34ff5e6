use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

use crate::catalog::{StorageKind, ValidationKind};

/// Name of the implicit identifier field carried by every compiled entity.
pub const ID_FIELD: &str = "id";

/// A column of the storage shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageField {
    pub name: String,
    pub kind: StorageKind,
    pub nullable: bool,
    #[serde(default)]
    pub primary_key: bool,
}

/// The field layout used to persist records of one entity.
///
/// The identifier field always comes first, followed by the declared
/// fields in description order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageShape {
    fields: Vec<StorageField>,
}

impl StorageShape {
    pub(crate) fn new(fields: Vec<StorageField>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[StorageField] {
        &self.fields
    }

    /// The identifier column.
    pub fn identifier(&self) -> &StorageField {
        &self.fields[0]
    }

    /// Every column except the identifier.
    pub fn data_fields(&self) -> &[StorageField] {
        &self.fields[1..]
    }

    pub fn field(&self, name: &str) -> Option<&StorageField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A field of a validation shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationField {
    pub name: String,
    pub kind: ValidationKind,
    pub optional: bool,
    /// Allowed values. Only set for `Select` fields that declare options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

/// Which boundary a validation shape guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeVariant {
    /// Incoming create payloads. No identifier.
    Create,
    /// Outgoing records. Identifier required.
    Read,
    /// Incoming partial updates. Every field may be omitted.
    Update,
}

/// Field layout and constraints used to accept or emit records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationShape {
    variant: ShapeVariant,
    fields: Vec<ValidationField>,
}

impl ValidationShape {
    pub(crate) fn new(variant: ShapeVariant, fields: Vec<ValidationField>) -> Self {
        Self { variant, fields }
    }

    pub fn variant(&self) -> ShapeVariant {
        self.variant
    }

    pub fn fields(&self) -> &[ValidationField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&ValidationField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Checks `payload` against this shape and returns the normalized
    /// object: keys outside the shape are dropped, optional fields left out
    /// of a create or read payload come back as `null`, dates and
    /// identifiers are rewritten in canonical form.
    pub fn validate(&self, payload: &Value) -> Result<Map<String, Value>, ValidationErrors> {
        let Some(object) = payload.as_object() else {
            return Err(ValidationErrors::single("", "expected a JSON object"));
        };

        let mut out = Map::new();
        let mut errors = Vec::new();

        for field in &self.fields {
            match object.get(&field.name) {
                None if self.variant == ShapeVariant::Update => {}
                None | Some(Value::Null) if field.optional => {
                    out.insert(field.name.clone(), Value::Null);
                }
                None => errors.push(FieldError::new(&field.name, "field required")),
                Some(Value::Null) => {
                    errors.push(FieldError::new(&field.name, "field cannot be null"))
                }
                Some(value) => match check_value(field, value) {
                    Ok(normalized) => {
                        out.insert(field.name.clone(), normalized);
                    }
                    Err(message) => errors.push(FieldError::new(&field.name, message)),
                },
            }
        }

        if errors.is_empty() {
            Ok(out)
        } else {
            Err(ValidationErrors(errors))
        }
    }
}

fn check_value(field: &ValidationField, value: &Value) -> Result<Value, String> {
    let normalized = match field.kind {
        ValidationKind::Uuid => {
            let s = value.as_str().ok_or("expected a UUID string")?;
            let id = Uuid::parse_str(s).map_err(|_| "invalid UUID".to_string())?;
            Value::String(id.hyphenated().to_string())
        }
        ValidationKind::String => value
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or("expected a string")?,
        ValidationKind::Email => {
            let s = value.as_str().ok_or("expected a string")?;
            if !is_email(s) {
                return Err("invalid email address".into());
            }
            Value::String(s.to_string())
        }
        ValidationKind::Bool => value.as_bool().map(Value::Bool).ok_or("expected a boolean")?,
        ValidationKind::Int => value
            .as_i64()
            .map(Value::from)
            .ok_or("expected an integer")?,
        ValidationKind::Float => value
            .as_f64()
            .map(Value::from)
            .ok_or("expected a number")?,
        ValidationKind::Date => {
            let s = value.as_str().ok_or("expected a date string")?;
            let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map_err(|_| "expected a date formatted as YYYY-MM-DD".to_string())?;
            Value::String(date.format("%Y-%m-%d").to_string())
        }
    };

    if let (Some(options), Some(s)) = (&field.options, normalized.as_str()) {
        if !options.iter().any(|o| o == s) {
            return Err(format!("must be one of: {}", options.join(", ")));
        }
    }

    Ok(normalized)
}

fn is_email(s: &str) -> bool {
    let mut parts = s.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && !domain.is_empty()
                && !s.chars().any(char::is_whitespace)
        }
        _ => false,
    }
}

/// One field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// All field errors found while validating one payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        Self(vec![FieldError::new(field, message)])
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    /// True if some error is attached to `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            if e.field.is_empty() {
                write!(f, "{}", e.message)?;
            } else {
                write!(f, "{}: {}", e.field, e.message)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_check() {
        assert!(is_email("a@b.com"));
        assert!(!is_email("a@@b.com"));
        assert!(!is_email("@b.com"));
        assert!(!is_email("a@"));
        assert!(!is_email("a b@c.com"));
        assert!(!is_email("plain"));
    }
}
