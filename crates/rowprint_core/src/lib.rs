//! # rowprint Core
//!
//! Row fingerprints and optimistic concurrency checks.
//!
//! This crate provides:
//! - Deterministic fingerprints of record snapshots, stable across processes
//! - Record schemas fixing column order, key and fingerprinted columns
//! - Concurrency tokens issued at load time and checked at write time
//! - An in-memory record store that applies compare-then-write atomically
//!
//! ## Usage
//!
//! ```
//! use rowprint_core::{Column, ColumnType, Config, RecordKey, RecordSchema, RecordStore};
//!
//! let schema = RecordSchema::builder("Category")
//!     .column(Column::new("Id", ColumnType::Integer).key())
//!     .column(Column::new("Name", ColumnType::Text))
//!     .build()
//!     .unwrap();
//! let store = RecordStore::new(schema.clone(), Config::default());
//!
//! let row = schema.snapshot().set("Id", 1).unwrap().set("Name", "Widgets").unwrap().build().unwrap();
//! store.insert(row).unwrap();
//!
//! let alice = store.load(&RecordKey::from(1)).unwrap();
//! let bob = store.load(&RecordKey::from(1)).unwrap();
//!
//! let renamed = alice.snapshot().with_value("Name", "Gadgets").unwrap();
//! assert!(store.update(alice.token(), renamed).unwrap().is_applied());
//!
//! let stale = bob.snapshot().with_value("Name", "Gizmos").unwrap();
//! assert!(store.update(bob.token(), stale).unwrap().is_conflict());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod fingerprint;
mod schema;
mod snapshot;
mod source;
mod store;
mod token;

pub use config::{Config, DEFAULT_DOMAIN_TAG};
pub use error::{CoreError, CoreResult};
pub use fingerprint::{compare, fingerprint, Comparison, Fingerprint, FingerprintEngine};
pub use schema::{
    Column, ColumnType, DeriveFn, DerivedField, RecordSchema, RecordSchemaBuilder, SnapshotBuilder,
};
pub use snapshot::{RecordKey, RecordSnapshot};
pub use source::{load, FnExtractor, LoadedRecord, RecordSource, SnapshotExtractor};
pub use store::{ConflictReport, RecordStore, WriteOutcome};
pub use token::ConcurrencyToken;

/// Re-exported so callers can build snapshots without a direct codec dependency.
pub use rowprint_codec::{Decimal, Value, ValueKind};
