//! # Error Types
//!
//! Three classes of failure, kept apart so callers can react to each:
//!
//! - **Usage errors** ([`ValidateError::WrongType`]): the value handed to
//!   the validator is not a record (or is an absent pointer). Nothing is
//!   processed.
//! - **Compilation errors** ([`CompileError`]): a tag or rule map cannot
//!   be turned into constraints. Always names the offending fragment.
//! - **Violations** ([`Violations`]): the expected output of a failed
//!   check. Collected exhaustively; their presence is the failure signal
//!   and a passing record yields `Ok(())`, never an empty collection.

use std::fmt;

use thiserror::Error;

use crate::reflect::Kind;

/// A tag or rule map that cannot be compiled into constraints.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// Unknown rule name, or a rule that does not apply to the field's kind.
    #[error("unsupported rule '{fragment}' on field '{record}.{field}': {reason}")]
    UnsupportedRule {
        /// Cache key of the record being compiled.
        record: String,
        field: String,
        /// The tag fragment as written.
        fragment: String,
        reason: String,
    },

    /// A rule parameter that does not parse as the field's kind.
    #[error("invalid literal in rule '{fragment}' on field '{record}.{field}': expected {target}")]
    InvalidLiteral {
        record: String,
        field: String,
        fragment: String,
        /// The kind the parameter had to parse as.
        target: Kind,
    },

    /// Tag text that is not a comma-separated list of rule tokens.
    #[error("malformed tag '{tag}' on field '{record}.{field}': {reason}")]
    MalformedTag {
        record: String,
        field: String,
        tag: String,
        reason: String,
    },

    /// A rule map entry for a field the record does not declare.
    #[error("rule map for '{record}' names unknown field '{field}'")]
    UnknownField { record: String, field: String },
}

impl CompileError {
    /// The tag fragment that caused the error, where there is one.
    pub fn fragment(&self) -> Option<&str> {
        match self {
            CompileError::UnsupportedRule { fragment, .. }
            | CompileError::InvalidLiteral { fragment, .. } => Some(fragment),
            CompileError::MalformedTag { tag, .. } => Some(tag),
            CompileError::UnknownField { .. } => None,
        }
    }
}

/// Error returned by every public validator operation.
#[derive(Error, Debug)]
pub enum ValidateError {
    /// The value, after dereferencing, is not a record.
    #[error("wrong argument type: expected a record, found {found}")]
    WrongType { found: Kind },

    /// Rule compilation failed, either explicitly or on first use.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// The record was checked and at least one constraint failed.
    #[error("{0}")]
    Violations(Violations),

    /// Record nesting went deeper than the configured limit.
    #[error("record nesting at '{path}' exceeds the depth limit of {limit}")]
    DepthExceeded { path: String, limit: usize },
}

impl ValidateError {
    /// Returns the violations if this is a failed check.
    pub fn violations(&self) -> Option<&Violations> {
        match self {
            ValidateError::Violations(v) => Some(v),
            _ => None,
        }
    }

    /// Consumes self and returns the violations if this is a failed check.
    pub fn into_violations(self) -> Option<Violations> {
        match self {
            ValidateError::Violations(v) => Some(v),
            _ => None,
        }
    }
}

// ─── Violations ─────────────────────────────────────────────────────

/// One failed constraint: where, and which rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Violation {
    field: String,
    rule: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, rule: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            rule: rule.into(),
        }
    }

    /// Dot-joined path from the validation root, e.g. `Order.shipping.zip`.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The tag fragment that failed, e.g. `len=5`.
    pub fn rule(&self) -> &str {
        &self.rule
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field '{}' violates rule '{}'", self.field, self.rule)
    }
}

/// Ordered, non-empty collection of violations from one validation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violations {
    violations: Vec<Violation>,
}

impl Violations {
    /// Wraps collected violations; `None` when nothing failed.
    pub(crate) fn from_vec(violations: Vec<Violation>) -> Option<Self> {
        if violations.is_empty() {
            None
        } else {
            Some(Self { violations })
        }
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Always `false` for collections produced by the validator.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Violation> {
        self.violations.iter()
    }

    /// Field paths in report order.
    pub fn fields(&self) -> Vec<&str> {
        self.violations.iter().map(Violation::field).collect()
    }

    /// Consumes self and returns the inner Vec.
    pub fn into_inner(self) -> Vec<Violation> {
        self.violations
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

impl IntoIterator for Violations {
    type Item = Violation;
    type IntoIter = std::vec::IntoIter<Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.violations.into_iter()
    }
}

impl<'a> IntoIterator for &'a Violations {
    type Item = &'a Violation;
    type IntoIter = std::slice::Iter<'a, Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.violations.iter()
    }
}
