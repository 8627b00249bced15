//! # Constraint Table
//!
//! Maps each rule name to a predicate `(runtime kind, value, param) -> bool`
//! and resolves a rule's textual parameter into a typed [`Param`] once, at
//! compile time. Traversal never re-parses or type-switches on literals;
//! it only calls the bound predicate.
//!
//! ## Adding a rule
//!
//! Add a [`RuleKind`] variant, give it a name in [`RuleKind::name`], an
//! applicability check in [`Constraint::compile`], and a predicate in
//! [`RuleKind::predicate`].

use std::cmp::Ordering;
use std::fmt;

use crate::reflect::{Complex, Kind, Value};
use crate::tag::FieldContext;

/// The closed set of rule names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// Numeric greater-than.
    Gt,
    /// Numeric equality, including complex.
    Eq,
    /// Numeric less-than.
    Ls,
    /// Exact length of a string, array or slice.
    Len,
    /// Lower bound on every element of an array or slice.
    Min,
    /// Upper bound on every element of an array or slice.
    Max,
    /// Non-nil pointer, or non-zero value.
    Required,
}

impl RuleKind {
    pub const ALL: [RuleKind; 7] = [
        RuleKind::Gt,
        RuleKind::Eq,
        RuleKind::Ls,
        RuleKind::Len,
        RuleKind::Min,
        RuleKind::Max,
        RuleKind::Required,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|rule| rule.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            RuleKind::Gt => "gt",
            RuleKind::Eq => "eq",
            RuleKind::Ls => "ls",
            RuleKind::Len => "len",
            RuleKind::Min => "min",
            RuleKind::Max => "max",
            RuleKind::Required => "required",
        }
    }

    fn predicate(&self) -> Predicate {
        match self {
            RuleKind::Gt => greater,
            RuleKind::Eq => equal,
            RuleKind::Ls => less,
            RuleKind::Len => length,
            RuleKind::Min => at_least,
            RuleKind::Max => at_most,
            RuleKind::Required => required,
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A rule parameter, typed by the field it was compiled against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Param {
    Int(i64),
    Uint(u64),
    Float(f64),
    Complex(Complex),
    /// Expected length.
    Len(usize),
    /// For `required`: whether the declared field type was a pointer.
    Pointer(bool),
}

/// Executable check. The kind is the value's runtime kind, which is
/// [`Kind::Pointer`] for an absent pointer.
pub type Predicate = fn(Kind, &Value<'_>, &Param) -> bool;

/// Why a rule could not be bound to a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Rejection {
    Unsupported(String),
    InvalidLiteral(Kind),
    Malformed(String),
}

/// One compiled rule: kind, typed parameter, bound predicate, and the
/// tag fragment it came from.
#[derive(Clone)]
pub struct Constraint {
    rule: RuleKind,
    param: Param,
    predicate: Predicate,
    fragment: String,
}

impl Constraint {
    /// Binds `rule` to a field, parsing `param` as the field's kind.
    pub(crate) fn compile(
        rule: RuleKind,
        param: Option<&str>,
        fragment: &str,
        field: &FieldContext<'_>,
    ) -> Result<Self, Rejection> {
        let param = match rule {
            RuleKind::Gt | RuleKind::Ls => {
                if !field.kind.is_ordered() {
                    return Err(not_applicable(rule, "int, uint and float", field.kind));
                }
                numeric_param(field.kind, param)?
            }
            RuleKind::Eq => {
                if !field.kind.is_numeric() {
                    return Err(not_applicable(rule, "numeric", field.kind));
                }
                numeric_param(field.kind, param)?
            }
            RuleKind::Len => {
                if !matches!(field.kind, Kind::String | Kind::Array | Kind::Slice) {
                    return Err(not_applicable(rule, "string, array and slice", field.kind));
                }
                let n = param
                    .and_then(|p| p.parse::<usize>().ok())
                    .ok_or(Rejection::InvalidLiteral(Kind::Uint))?;
                Param::Len(n)
            }
            RuleKind::Min | RuleKind::Max => {
                if !field.kind.is_sequence() {
                    return Err(not_applicable(rule, "array and slice", field.kind));
                }
                match field.elem {
                    Some(elem) if elem.is_ordered() => numeric_param(elem, param)?,
                    Some(elem) => {
                        return Err(Rejection::Unsupported(format!(
                            "`{rule}` needs int, uint or float elements, not {elem}"
                        )))
                    }
                    None => {
                        return Err(Rejection::Unsupported(format!(
                            "`{rule}` needs a known element kind"
                        )))
                    }
                }
            }
            RuleKind::Required => {
                if param.is_some() {
                    return Err(Rejection::Malformed("`required` takes no parameter".into()));
                }
                if field.kind == Kind::Opaque && !field.declared_pointer {
                    return Err(not_applicable(rule, "inspectable", field.kind));
                }
                Param::Pointer(field.declared_pointer)
            }
        };

        Ok(Self {
            rule,
            param,
            predicate: rule.predicate(),
            fragment: fragment.to_string(),
        })
    }

    pub fn rule(&self) -> RuleKind {
        self.rule
    }

    pub fn param(&self) -> &Param {
        &self.param
    }

    /// The tag fragment as written, e.g. `gt=10`.
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// Runs the predicate against a field's current value.
    pub fn check(&self, value: &Value<'_>) -> bool {
        (self.predicate)(value.kind(), value, &self.param)
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constraint")
            .field("rule", &self.rule)
            .field("param", &self.param)
            .field("fragment", &self.fragment)
            .finish()
    }
}

fn not_applicable(rule: RuleKind, expected: &str, found: Kind) -> Rejection {
    Rejection::Unsupported(format!("`{rule}` applies to {expected} fields, not {found}"))
}

/// Kind-directed literal parsing.
fn numeric_param(kind: Kind, literal: Option<&str>) -> Result<Param, Rejection> {
    let invalid = || Rejection::InvalidLiteral(kind);
    let literal = literal.ok_or_else(invalid)?;
    match kind {
        Kind::Int => literal.parse().map(Param::Int).map_err(|_| invalid()),
        Kind::Uint => literal.parse().map(Param::Uint).map_err(|_| invalid()),
        Kind::Float => literal.parse().map(Param::Float).map_err(|_| invalid()),
        Kind::Complex => literal.parse().map(Param::Complex).map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

// ─── Predicates ─────────────────────────────────────────────────────

enum Comparison {
    Ordered(Ordering),
    /// A NaN on either side.
    Unordered,
    /// Nil, or a value the parameter does not describe.
    Inapplicable,
}

fn compare(value: &Value<'_>, param: &Param) -> Comparison {
    match (value, param) {
        (Value::Int(v), Param::Int(p)) => Comparison::Ordered(v.cmp(p)),
        (Value::Uint(v), Param::Uint(p)) => Comparison::Ordered(v.cmp(p)),
        (Value::Float(v), Param::Float(p)) => {
            v.partial_cmp(p).map_or(Comparison::Unordered, Comparison::Ordered)
        }
        _ => Comparison::Inapplicable,
    }
}

fn greater(_kind: Kind, value: &Value<'_>, param: &Param) -> bool {
    match compare(value, param) {
        Comparison::Ordered(ord) => ord == Ordering::Greater,
        Comparison::Unordered => false,
        Comparison::Inapplicable => true,
    }
}

fn less(_kind: Kind, value: &Value<'_>, param: &Param) -> bool {
    match compare(value, param) {
        Comparison::Ordered(ord) => ord == Ordering::Less,
        Comparison::Unordered => false,
        Comparison::Inapplicable => true,
    }
}

fn equal(_kind: Kind, value: &Value<'_>, param: &Param) -> bool {
    if let (Value::Complex(v), Param::Complex(p)) = (value, param) {
        return v == p;
    }
    match compare(value, param) {
        Comparison::Ordered(ord) => ord == Ordering::Equal,
        Comparison::Unordered => false,
        Comparison::Inapplicable => true,
    }
}

fn length(_kind: Kind, value: &Value<'_>, param: &Param) -> bool {
    let Param::Len(expected) = param else {
        return true;
    };
    match value {
        Value::Str(s) => s.chars().count() == *expected,
        Value::Array(seq) | Value::Slice(seq) => seq.len() == *expected,
        _ => true,
    }
}

/// Every non-nil element compares without failing `bad`.
fn elements_within(value: &Value<'_>, param: &Param, bad: Ordering) -> bool {
    match value {
        Value::Array(seq) | Value::Slice(seq) => seq.iter().all(|item| match compare(&item, param) {
            Comparison::Ordered(ord) => ord != bad,
            Comparison::Unordered => false,
            Comparison::Inapplicable => true,
        }),
        _ => true,
    }
}

fn at_least(_kind: Kind, value: &Value<'_>, param: &Param) -> bool {
    elements_within(value, param, Ordering::Less)
}

fn at_most(_kind: Kind, value: &Value<'_>, param: &Param) -> bool {
    elements_within(value, param, Ordering::Greater)
}

fn required(kind: Kind, value: &Value<'_>, param: &Param) -> bool {
    match param {
        Param::Pointer(true) => kind != Kind::Pointer,
        _ => !value.is_zero(),
    }
}
