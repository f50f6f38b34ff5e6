//! Field type catalog.
//!
//! Maps the abstract field type names used in entity descriptions
//! (`"Data"`, `"Email"`, `"Check"`, ...) to the pair of representations the
//! compiler needs: how the value is persisted and how it is validated at
//! the network boundary.

use serde::{Deserialize, Serialize};

/// How a field is persisted by the storage layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    /// Globally-unique identifier, stored in its hyphenated text form.
    Uuid,
    Text,
    Boolean,
    Integer,
    Float,
    Date,
}

impl StorageKind {
    /// Column type used when materializing the storage shape.
    pub fn sql_type(self) -> &'static str {
        match self {
            StorageKind::Uuid => "TEXT",
            StorageKind::Text => "TEXT",
            StorageKind::Boolean => "BOOLEAN",
            StorageKind::Integer => "INTEGER",
            StorageKind::Float => "REAL",
            StorageKind::Date => "DATE",
        }
    }
}

/// How a field value is checked when it crosses the network boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationKind {
    Uuid,
    String,
    Email,
    Bool,
    Int,
    Float,
    Date,
}

/// The resolved representation pair for one catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldKind {
    pub storage: StorageKind,
    pub validation: ValidationKind,
}

const fn kind(storage: StorageKind, validation: ValidationKind) -> FieldKind {
    FieldKind {
        storage,
        validation,
    }
}

/// The only field type whose `options` restrict accepted values.
pub const SELECT_TYPE: &str = "Select";

/// Every field type name the catalog understands, in a fixed order.
const ENTRIES: &[(&str, FieldKind)] = &[
    ("Data", kind(StorageKind::Text, ValidationKind::String)),
    ("Link", kind(StorageKind::Text, ValidationKind::String)),
    (SELECT_TYPE, kind(StorageKind::Text, ValidationKind::String)),
    ("Attach Image", kind(StorageKind::Text, ValidationKind::String)),
    ("Text", kind(StorageKind::Text, ValidationKind::String)),
    ("Read Only", kind(StorageKind::Text, ValidationKind::String)),
    ("Email", kind(StorageKind::Text, ValidationKind::Email)),
    ("Check", kind(StorageKind::Boolean, ValidationKind::Bool)),
    ("Int", kind(StorageKind::Integer, ValidationKind::Int)),
    ("Float", kind(StorageKind::Float, ValidationKind::Float)),
    ("Currency", kind(StorageKind::Float, ValidationKind::Float)),
    ("Date", kind(StorageKind::Date, ValidationKind::Date)),
];

/// Kind of the implicit identifier field every compiled entity carries.
pub const IDENTIFIER_KIND: FieldKind = kind(StorageKind::Uuid, ValidationKind::Uuid);

/// Resolves a field type name. Unknown names yield `None`.
///
/// Lookup is case-sensitive: `"email"` is not `"Email"`.
pub fn resolve(fieldtype: &str) -> Option<FieldKind> {
    ENTRIES
        .iter()
        .find(|(name, _)| *name == fieldtype)
        .map(|(_, kind)| *kind)
}

/// All known field type names.
pub fn field_type_names() -> impl Iterator<Item = &'static str> {
    ENTRIES.iter().map(|(name, _)| *name)
}
