//! SQLite storage layer for schemaforge.
//!
//! Persists records of compiled entities, one table per entity.
//!
//! # Architecture
//!
//! - [`Store`] owns the database location and a pool of idle connections
//! - [`Session`] is a scoped claim on one connection, released on drop
//! - [`Tx`] wraps a transaction and exposes the persistence primitives
//!   (insert, fetch, update, delete, scan), each driven by the compiled
//!   storage shape of a registry entry
//! - Tables are created from the storage shape by [`Store::materialize`];
//!   existing tables are never altered

mod error;
mod store;
mod table;

pub use error::{StorageError, StorageResult};
pub use store::{Session, Store};
pub use table::{table_name, Tx};
