//! Generic CRUD engine for schemaforge.
//!
//! A [`CrudBinding`] pairs a registry entry with its lifecycle hooks and
//! serves list, get, create, update and delete for that entity over any
//! storage [`schemaforge_storage::Session`]. Nothing here is specific to an
//! entity: field layout, validation and persistence all come from the
//! compiled shapes of the entry.

mod binding;
mod error;

pub use binding::{CrudBinding, Page, DEFAULT_PAGE_LIMIT};
pub use error::{CrudError, CrudResult};
