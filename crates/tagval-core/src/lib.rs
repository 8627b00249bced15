//! # tagval-core — Tag-Driven Record Validation
//!
//! Validates records against declarative per-field rules without
//! hand-written validation code per type. Rules are read from field tags
//! (or from a caller-supplied [`RuleMap`]), compiled once per record type
//! into a [`CompiledRuleSet`], cached, and evaluated against the record's
//! current values. Every violation is reported, not just the first.
//!
//! ```ignore
//! use tagval_core::{Record, Validator};
//!
//! #[derive(Record)]
//! struct Order {
//!     #[validate("gt=0,ls=1000")]
//!     pub qty: u32,
//!     #[validate("len=5")]
//!     zip: String,
//! }
//!
//! let validator = Validator::new();
//! let err = validator.validate_struct(&order).unwrap_err();
//! // field 'Order.qty' violates rule 'gt=0'
//! ```
//!
//! ## Tag Grammar
//!
//! `rule[=param][,rule[=param]]*` with rules `gt`, `eq`, `ls` (numeric
//! comparison), `len` (exact length), `min`, `max` (bounds on every
//! element of an array or slice) and `required` (non-nil pointer, or
//! non-zero value). Unknown rules are compile errors, never ignored.
//!
//! ## Crate Policy
//!
//! - No `unsafe` code. Private fields are read through accessors the
//!   derive generates inside the type's own module.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - No global state: each [`Validator`] owns its [`RuleCache`].

// Lets `#[derive(Record)]` output (which names `::tagval_core`) expand
// inside this crate's own tests.
extern crate self as tagval_core;

pub mod cache;
mod compiler;
pub mod config;
pub mod constraint;
pub mod error;
pub mod reflect;
pub mod rulemap;
pub mod ruleset;
pub mod tag;
pub mod validator;

// Re-export primary types for ergonomic imports.
pub use cache::RuleCache;
pub use config::{ValidatorConfig, DEFAULT_MAX_DEPTH};
pub use constraint::{Constraint, Param, RuleKind};
pub use error::{CompileError, ValidateError, Violation, Violations};
pub use reflect::{
    Complex, FieldShape, Kind, Record, RecordShape, RecordType, Reflect, Sequence, TypeShape, Value,
};
pub use rulemap::{RuleEntry, RuleMap};
pub use ruleset::{CompiledRuleSet, FieldDescriptor, RuleSource};
pub use validator::Validator;

#[cfg(feature = "derive")]
pub use tagval_derive::Record;
