//! Entity model for schemaforge.
//!
//! Turns declarative entity descriptions into the typed shapes every other
//! crate works with:
//! - [`catalog`]: field type names to storage and validation kinds
//! - [`EntityDescription`]: the parsed `doctype.json`
//! - [`Compiler`]: description to [`CompiledEntity`] (storage shape plus
//!   create/read/update [`ValidationShape`]s)
//! - [`RegistryBuilder`] / [`EntityRegistry`]: compiled entities by key
//! - [`EntityHooks`]: optional lifecycle callbacks for one entity
//!
//! Compiled shapes are plain data. Nothing in this crate performs I/O.

pub mod catalog;
mod compiler;
mod description;
mod error;
mod hooks;
mod identity;
mod key;
mod record;
mod registry;
mod shape;

pub use catalog::{FieldKind, StorageKind, ValidationKind};
pub use compiler::{
    compile, CompileWarning, Compiled, CompiledEntity, Compiler, UnknownFieldPolicy,
};
pub use description::{EntityDescription, FieldDescription};
pub use error::{ModelError, ModelResult};
pub use hooks::{EntityHooks, HookContext, HookError, NoHooks, Operation};
pub use identity::{AuthError, Identity, IdentityResolver};
pub use key::EntityKey;
pub use record::Record;
pub use registry::{EntityRegistry, RegistryBuilder, RegistryEntry};
pub use shape::{
    FieldError, ShapeVariant, StorageField, StorageShape, ValidationErrors, ValidationField,
    ValidationShape, ID_FIELD,
};
