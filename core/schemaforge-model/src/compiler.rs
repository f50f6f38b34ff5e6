//! Entity compiler.
//!
//! Turns an [`EntityDescription`] into a [`CompiledEntity`]: a storage
//! shape plus the create/read/update validation shapes. Compilation is pure;
//! it neither logs nor registers anything. Non-fatal findings are returned
//! as [`CompileWarning`]s for the caller to report.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::catalog::{self, IDENTIFIER_KIND, SELECT_TYPE};
use crate::description::EntityDescription;
use crate::error::{ModelError, ModelResult};
use crate::shape::{
    ID_FIELD, ShapeVariant, StorageField, StorageShape, ValidationField, ValidationShape,
};

/// What to do with a field whose `fieldtype` is not in the catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownFieldPolicy {
    /// Drop the field without a trace.
    Ignore,
    /// Drop the field and report a [`CompileWarning::UnknownFieldType`].
    #[default]
    Warn,
    /// Fail compilation.
    Reject,
}

/// A non-fatal compilation finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileWarning {
    /// A field was dropped because its type is not in the catalog.
    UnknownFieldType { field: String, fieldtype: String },
    /// A field was dropped because it has no name.
    UnnamedField { fieldtype: String },
    /// No field resolved; the entity only carries its identifier.
    NoFields,
}

impl fmt::Display for CompileWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileWarning::UnknownFieldType { field, fieldtype } => {
                write!(f, "field '{field}' dropped: unknown field type '{fieldtype}'")
            }
            CompileWarning::UnnamedField { fieldtype } => {
                write!(f, "unnamed field of type '{fieldtype}' dropped")
            }
            CompileWarning::NoFields => {
                f.write_str("no fields resolved; entity only has an identifier")
            }
        }
    }
}

/// The compiled form of one entity description.
///
/// Never mutated after compilation: a changed description compiles into a
/// new `CompiledEntity` that replaces the old one in the registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledEntity {
    name: String,
    storage: StorageShape,
    create: ValidationShape,
    read: ValidationShape,
    update: ValidationShape,
}

impl CompiledEntity {
    /// The entity name from the description (e.g. `"Customer"`).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn storage(&self) -> &StorageShape {
        &self.storage
    }

    /// Shape for create payloads: every declared field, no identifier.
    pub fn create_schema(&self) -> &ValidationShape {
        &self.create
    }

    /// Shape for emitted records: identifier plus every declared field.
    pub fn read_schema(&self) -> &ValidationShape {
        &self.read
    }

    /// Shape for partial updates.
    pub fn update_schema(&self) -> &ValidationShape {
        &self.update
    }
}

/// Output of a successful compilation.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub entity: CompiledEntity,
    pub warnings: Vec<CompileWarning>,
}

/// Compiles entity descriptions against the field type catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct Compiler {
    policy: UnknownFieldPolicy,
}

impl Compiler {
    pub fn new(policy: UnknownFieldPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> UnknownFieldPolicy {
        self.policy
    }

    pub fn compile(&self, description: &EntityDescription) -> ModelResult<Compiled> {
        let name = description.name.trim();
        if name.is_empty() {
            return Err(ModelError::MissingName);
        }

        let mut warnings = Vec::new();
        let mut seen = HashSet::new();
        let mut storage = vec![StorageField {
            name: ID_FIELD.into(),
            kind: IDENTIFIER_KIND.storage,
            nullable: false,
            primary_key: true,
        }];
        let mut base = Vec::new();

        for field in &description.fields {
            if field.fieldname.is_empty() {
                warnings.push(CompileWarning::UnnamedField {
                    fieldtype: field.fieldtype.clone(),
                });
                continue;
            }

            let Some(kind) = catalog::resolve(&field.fieldtype) else {
                match self.policy {
                    UnknownFieldPolicy::Ignore => {}
                    UnknownFieldPolicy::Warn => warnings.push(CompileWarning::UnknownFieldType {
                        field: field.fieldname.clone(),
                        fieldtype: field.fieldtype.clone(),
                    }),
                    UnknownFieldPolicy::Reject => {
                        return Err(ModelError::compilation(
                            name,
                            format!(
                                "field '{}' has unknown field type '{}'",
                                field.fieldname, field.fieldtype
                            ),
                        ));
                    }
                }
                continue;
            };

            if !is_identifier(&field.fieldname) {
                return Err(ModelError::compilation(
                    name,
                    format!("'{}' is not a valid field name", field.fieldname),
                ));
            }
            if field.fieldname.eq_ignore_ascii_case(ID_FIELD) {
                return Err(ModelError::compilation(
                    name,
                    "field name 'id' is reserved for the identifier",
                ));
            }
            if !seen.insert(field.fieldname.to_ascii_lowercase()) {
                return Err(ModelError::compilation(
                    name,
                    format!("duplicate field '{}'", field.fieldname),
                ));
            }

            storage.push(StorageField {
                name: field.fieldname.clone(),
                kind: kind.storage,
                nullable: !field.required,
                primary_key: false,
            });
            base.push(ValidationField {
                name: field.fieldname.clone(),
                kind: kind.validation,
                optional: !field.required,
                options: if field.fieldtype == SELECT_TYPE {
                    field.option_list()
                } else {
                    None
                },
            });
        }

        if base.is_empty() {
            warnings.push(CompileWarning::NoFields);
        }

        let mut read = Vec::with_capacity(base.len() + 1);
        read.push(ValidationField {
            name: ID_FIELD.into(),
            kind: IDENTIFIER_KIND.validation,
            optional: false,
            options: None,
        });
        read.extend(base.iter().cloned());

        let entity = CompiledEntity {
            name: name.to_string(),
            storage: StorageShape::new(storage),
            create: ValidationShape::new(ShapeVariant::Create, base.clone()),
            read: ValidationShape::new(ShapeVariant::Read, read),
            update: ValidationShape::new(ShapeVariant::Update, base),
        };

        Ok(Compiled { entity, warnings })
    }
}

/// Compiles with the default [`UnknownFieldPolicy`].
pub fn compile(description: &EntityDescription) -> ModelResult<Compiled> {
    Compiler::default().compile(description)
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
