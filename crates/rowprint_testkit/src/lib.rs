//! # rowprint Testkit
//!
//! Test utilities for rowprint.
//!
//! This crate provides:
//! - Sample record types (`Employee`, `Department`, `Product`) and stores
//! - Property-based test generators using proptest
//! - Cross-run fingerprint and encoding vectors
//! - Concurrent read-modify-write stress helpers
//! - A `tracing` subscriber for tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rowprint_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_store() {
//!     init_tracing();
//!     let store = employee_store().unwrap();
//!     // ... load, modify, write back
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;
pub mod vectors;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
    pub use crate::vectors::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
pub use vectors::*;
