//! # Type Introspection
//!
//! Describes record shapes and exposes runtime views of field values
//! without per-type validation code.
//!
//! ## Static vs Runtime
//!
//! Two views of every validatable type exist side by side:
//!
//! - [`TypeShape`] is derived from the *declared* type: its dereferenced
//!   [`Kind`], how many pointer layers wrap it, the element kind of arrays
//!   and slices, and (for records) a function that produces the nested
//!   [`RecordShape`]. Rule compilation only ever looks at shapes.
//!
//! - [`Value`] is the *current* value with pointer layers already followed.
//!   An absent pointer (`Option::None`) shows up as [`Value::Nil`], whose
//!   kind is [`Kind::Pointer`]. Traversal only ever looks at values.
//!
//! ## Opt-in Field Access
//!
//! [`Record`] is the capability a type grants to the validator: a shape
//! descriptor plus a read-only accessor per field. `#[derive(Record)]`
//! expands inside the type's own module, so non-`pub` fields are readable
//! without any visibility bypass, and nothing is ever written back.

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;
use std::str::FromStr;
use std::sync::mpsc::{Receiver, Sender, SyncSender};
use std::sync::Arc;

use thiserror::Error;

// ─── Kind ───────────────────────────────────────────────────────────

/// Runtime category of a value after pointer indirection is stripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Bool,
    /// Signed integers of any width, widened to `i64`.
    Int,
    /// Unsigned integers of any width, widened to `u64`.
    Uint,
    /// `f32` and `f64`, widened to `f64`.
    Float,
    /// 128-bit complex numbers ([`Complex`]).
    Complex,
    String,
    /// Fixed-length arrays.
    Array,
    /// Growable sequences.
    Slice,
    /// Maps and sets. Only their size is observable.
    Map,
    Record,
    /// An absent pointer. Never a declared kind.
    Pointer,
    /// Channels, functions, and anything else no rule can inspect.
    Opaque,
}

impl Kind {
    /// Returns the lowercase kind name used in error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Uint => "uint",
            Kind::Float => "float",
            Kind::Complex => "complex",
            Kind::String => "string",
            Kind::Array => "array",
            Kind::Slice => "slice",
            Kind::Map => "map",
            Kind::Record => "record",
            Kind::Pointer => "pointer",
            Kind::Opaque => "opaque",
        }
    }

    /// Integer, unsigned, floating, or complex.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Kind::Int | Kind::Uint | Kind::Float | Kind::Complex)
    }

    /// Numeric kinds with a total order on their literals.
    pub fn is_ordered(&self) -> bool {
        matches!(self, Kind::Int | Kind::Uint | Kind::Float)
    }

    /// Arrays and slices.
    pub fn is_sequence(&self) -> bool {
        matches!(self, Kind::Array | Kind::Slice)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Complex ────────────────────────────────────────────────────────

/// A complex number with `f64` real and imaginary parts.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub const fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    pub fn is_zero(&self) -> bool {
        self.re == 0.0 && self.im == 0.0
    }
}

impl fmt::Display for Complex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.im.is_sign_negative() {
            write!(f, "({}{}i)", self.re, self.im)
        } else {
            write!(f, "({}+{}i)", self.re, self.im)
        }
    }
}

/// A literal that does not parse as a complex number.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid complex literal '{0}'")]
pub struct ParseComplexError(String);

impl FromStr for Complex {
    type Err = ParseComplexError;

    /// Accepts `re`, `imi`, `re+imi` and `re-imi`, optionally wrapped in
    /// parentheses. A bare `i` is `0+1i`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseComplexError(s.to_string());
        let body = s
            .strip_prefix('(')
            .and_then(|b| b.strip_suffix(')'))
            .unwrap_or(s);
        if body.is_empty() {
            return Err(invalid());
        }

        let Some(without_i) = body.strip_suffix('i') else {
            let re = body.parse::<f64>().map_err(|_| invalid())?;
            return Ok(Complex::new(re, 0.0));
        };

        // The imaginary part starts at the last sign that is neither
        // leading nor an exponent sign.
        let bytes = without_i.as_bytes();
        let split = without_i.char_indices().rev().find_map(|(idx, c)| {
            let is_sign = c == '+' || c == '-';
            let after_exponent = idx > 0 && matches!(bytes[idx - 1], b'e' | b'E');
            (idx > 0 && is_sign && !after_exponent).then_some(idx)
        });
        let (re, im) = match split {
            Some(idx) => (&without_i[..idx], &without_i[idx..]),
            None => ("", without_i),
        };

        let re = if re.is_empty() {
            0.0
        } else {
            re.parse::<f64>().map_err(|_| invalid())?
        };
        let im = match im {
            "" | "+" => 1.0,
            "-" => -1.0,
            digits => digits.parse::<f64>().map_err(|_| invalid())?,
        };
        Ok(Complex::new(re, im))
    }
}

// ─── Shapes ─────────────────────────────────────────────────────────

/// Produces the shape of a record type on demand.
pub type DescribeFn = fn() -> RecordShape;

/// Static description of a declared field type.
#[derive(Debug, Clone, Copy)]
pub struct TypeShape {
    kind: Kind,
    pointer_depth: u8,
    elem: Option<Kind>,
    record: Option<DescribeFn>,
}

impl TypeShape {
    /// A non-container, non-record kind.
    pub const fn scalar(kind: Kind) -> Self {
        Self {
            kind,
            pointer_depth: 0,
            elem: None,
            record: None,
        }
    }

    /// An array or slice whose items dereference to `elem`.
    pub const fn sequence(kind: Kind, elem: Kind) -> Self {
        Self {
            kind,
            pointer_depth: 0,
            elem: Some(elem),
            record: None,
        }
    }

    /// A record whose shape is known statically.
    pub fn record<R: Record>() -> Self {
        Self {
            kind: Kind::Record,
            pointer_depth: 0,
            elem: None,
            record: Some(R::describe as DescribeFn),
        }
    }

    /// A record whose concrete type is only known at runtime.
    pub const fn dyn_record() -> Self {
        Self::scalar(Kind::Record)
    }

    pub const fn opaque() -> Self {
        Self::scalar(Kind::Opaque)
    }

    /// Wraps this shape in one more pointer layer.
    pub const fn pointer(self) -> Self {
        Self {
            pointer_depth: self.pointer_depth.saturating_add(1),
            ..self
        }
    }

    /// The dereferenced kind.
    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn pointer_depth(&self) -> u8 {
        self.pointer_depth
    }

    /// Whether the declared type had at least one pointer layer.
    pub fn is_pointer(&self) -> bool {
        self.pointer_depth > 0
    }

    /// Dereferenced item kind for arrays and slices.
    pub fn elem(&self) -> Option<Kind> {
        self.elem
    }

    /// The nested record shape, if statically known.
    pub fn record_shape(&self) -> Option<RecordShape> {
        self.record.map(|describe| describe())
    }
}

/// Identity of a record type: printable name, full type path, and `TypeId`.
///
/// The printable name is the bare identifier and is used as the root of
/// violation paths. It is not unique; the full type path usually is, and
/// the `TypeId` always is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordType {
    name: &'static str,
    type_name: &'static str,
    type_id: TypeId,
}

impl RecordType {
    pub fn of<R: Any + ?Sized>(name: &'static str) -> Self {
        Self {
            name,
            type_name: std::any::type_name::<R>(),
            type_id: TypeId::of::<R>(),
        }
    }

    #[cfg(test)]
    pub(crate) fn from_parts(name: &'static str, type_name: &'static str, type_id: TypeId) -> Self {
        Self {
            name,
            type_name,
            type_id,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }
}

/// One declared field of a record.
#[derive(Debug, Clone)]
pub struct FieldShape {
    index: usize,
    name: &'static str,
    exported: bool,
    tag: Option<&'static str>,
    ty: TypeShape,
}

impl FieldShape {
    pub fn new(
        index: usize,
        name: &'static str,
        exported: bool,
        tag: Option<&'static str>,
        ty: TypeShape,
    ) -> Self {
        Self {
            index,
            name,
            exported,
            tag,
            ty,
        }
    }

    /// Declaration index within the record.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// `true` for plain `pub` fields.
    pub fn exported(&self) -> bool {
        self.exported
    }

    /// Raw tag string, if the field carries one.
    pub fn tag(&self) -> Option<&'static str> {
        self.tag
    }

    pub fn ty(&self) -> &TypeShape {
        &self.ty
    }
}

/// Declared fields of a record type, in declaration order.
#[derive(Debug, Clone)]
pub struct RecordShape {
    record_type: RecordType,
    fields: Vec<FieldShape>,
}

impl RecordShape {
    pub fn new(record_type: RecordType, fields: Vec<FieldShape>) -> Self {
        Self {
            record_type,
            fields,
        }
    }

    pub fn record_type(&self) -> &RecordType {
        &self.record_type
    }

    pub fn fields(&self) -> &[FieldShape] {
        &self.fields
    }

    pub fn field_by_name(&self, name: &str) -> Option<&FieldShape> {
        self.fields.iter().find(|f| f.name == name)
    }
}

// ─── Runtime Values ─────────────────────────────────────────────────

/// Read-only view of a field's current value, pointers already followed.
#[derive(Clone, Copy)]
pub enum Value<'a> {
    /// An absent pointer.
    Nil,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Complex(Complex),
    Str(&'a str),
    Array(&'a dyn Sequence),
    Slice(&'a dyn Sequence),
    /// A map or set, by size.
    Map(usize),
    Record(&'a dyn Record),
    Opaque,
}

impl<'a> Value<'a> {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Nil => Kind::Pointer,
            Value::Bool(_) => Kind::Bool,
            Value::Int(_) => Kind::Int,
            Value::Uint(_) => Kind::Uint,
            Value::Float(_) => Kind::Float,
            Value::Complex(_) => Kind::Complex,
            Value::Str(_) => Kind::String,
            Value::Array(_) => Kind::Array,
            Value::Slice(_) => Kind::Slice,
            Value::Map(_) => Kind::Map,
            Value::Record(_) => Kind::Record,
            Value::Opaque => Kind::Opaque,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Whether this is the zero value of its kind.
    ///
    /// Arrays and records are zero when every item or field is zero;
    /// slices and maps when empty. Opaque values are never zero. An item
    /// or field declared as a pointer is zero only when it is nil, even if
    /// it points at a zero value.
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Nil => true,
            Value::Bool(b) => !b,
            Value::Int(n) => *n == 0,
            Value::Uint(n) => *n == 0,
            Value::Float(n) => *n == 0.0,
            Value::Complex(c) => c.is_zero(),
            Value::Str(s) => s.is_empty(),
            Value::Array(seq) => {
                let pointers = seq.items_are_pointers();
                seq.iter().all(|item| zero_slot(&item, pointers))
            }
            Value::Slice(seq) => seq.is_empty(),
            Value::Map(len) => *len == 0,
            Value::Record(record) => record
                .shape()
                .fields()
                .iter()
                .all(|f| zero_slot(&record.field(f.index()), f.ty().is_pointer())),
            Value::Opaque => false,
        }
    }
}

/// Zero test for a field or item, given whether it was declared as a pointer.
fn zero_slot(value: &Value<'_>, declared_pointer: bool) -> bool {
    if declared_pointer {
        value.is_nil()
    } else {
        value.is_zero()
    }
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("Nil"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Int(n) => f.debug_tuple("Int").field(n).finish(),
            Value::Uint(n) => f.debug_tuple("Uint").field(n).finish(),
            Value::Float(n) => f.debug_tuple("Float").field(n).finish(),
            Value::Complex(c) => f.debug_tuple("Complex").field(c).finish(),
            Value::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Value::Array(seq) => f.debug_struct("Array").field("len", &seq.len()).finish(),
            Value::Slice(seq) => f.debug_struct("Slice").field("len", &seq.len()).finish(),
            Value::Map(len) => f.debug_struct("Map").field("len", len).finish(),
            Value::Record(record) => f
                .debug_tuple("Record")
                .field(&record.record_type().name())
                .finish(),
            Value::Opaque => f.write_str("Opaque"),
        }
    }
}

/// Indexed read access to the items of an array or slice.
pub trait Sequence {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Item at `index`, or [`Value::Nil`] past the end.
    fn item(&self, index: usize) -> Value<'_>;

    /// Whether the item type carries a pointer layer.
    fn items_are_pointers(&self) -> bool {
        false
    }
}

impl<'s> dyn Sequence + 's {
    pub fn iter(&self) -> impl Iterator<Item = Value<'_>> + '_ {
        (0..self.len()).map(move |i| self.item(i))
    }
}

// ─── Traits ─────────────────────────────────────────────────────────

/// A type whose values the validator can read.
pub trait Reflect {
    /// Static shape of the declared type.
    fn type_shape() -> TypeShape
    where
        Self: Sized;

    /// Current value with pointer layers followed.
    fn reflect(&self) -> Value<'_>;
}

/// A record type that exposes its shape and fields to the validator.
///
/// Normally generated by `#[derive(Record)]`. Hand-written impls must
/// report fields in declaration order and keep `field(i)` consistent
/// with `describe().fields()[i]`.
pub trait Record: Any {
    fn describe() -> RecordShape
    where
        Self: Sized;

    fn record_type(&self) -> RecordType;

    /// Same as [`Record::describe`], callable through `dyn Record`.
    fn shape(&self) -> RecordShape;

    fn field_count(&self) -> usize;

    /// Read-only view of field `index`; [`Value::Nil`] when out of range.
    fn field(&self, index: usize) -> Value<'_>;
}

// ─── Reflect impls ──────────────────────────────────────────────────

macro_rules! reflect_widened {
    ($kind:ident, $wide:ty => $($ty:ty),+) => {
        $(
            impl Reflect for $ty {
                fn type_shape() -> TypeShape {
                    TypeShape::scalar(Kind::$kind)
                }

                fn reflect(&self) -> Value<'_> {
                    Value::$kind(<$wide>::from(*self))
                }
            }
        )+
    };
}

reflect_widened!(Int, i64 => i8, i16, i32, i64);
reflect_widened!(Uint, u64 => u8, u16, u32, u64);
reflect_widened!(Float, f64 => f32, f64);

impl Reflect for isize {
    fn type_shape() -> TypeShape {
        TypeShape::scalar(Kind::Int)
    }

    fn reflect(&self) -> Value<'_> {
        Value::Int(*self as i64)
    }
}

impl Reflect for usize {
    fn type_shape() -> TypeShape {
        TypeShape::scalar(Kind::Uint)
    }

    fn reflect(&self) -> Value<'_> {
        Value::Uint(*self as u64)
    }
}

impl Reflect for bool {
    fn type_shape() -> TypeShape {
        TypeShape::scalar(Kind::Bool)
    }

    fn reflect(&self) -> Value<'_> {
        Value::Bool(*self)
    }
}

impl Reflect for Complex {
    fn type_shape() -> TypeShape {
        TypeShape::scalar(Kind::Complex)
    }

    fn reflect(&self) -> Value<'_> {
        Value::Complex(*self)
    }
}

impl Reflect for String {
    fn type_shape() -> TypeShape {
        TypeShape::scalar(Kind::String)
    }

    fn reflect(&self) -> Value<'_> {
        Value::Str(self.as_str())
    }
}

impl Reflect for &'static str {
    fn type_shape() -> TypeShape {
        TypeShape::scalar(Kind::String)
    }

    fn reflect(&self) -> Value<'_> {
        Value::Str(self)
    }
}

impl<T: Reflect> Reflect for Option<T> {
    fn type_shape() -> TypeShape {
        T::type_shape().pointer()
    }

    fn reflect(&self) -> Value<'_> {
        match self {
            Some(inner) => inner.reflect(),
            None => Value::Nil,
        }
    }
}

impl<T: Reflect> Reflect for Box<T> {
    fn type_shape() -> TypeShape {
        T::type_shape().pointer()
    }

    fn reflect(&self) -> Value<'_> {
        (**self).reflect()
    }
}

impl<T: Reflect> Reflect for Rc<T> {
    fn type_shape() -> TypeShape {
        T::type_shape().pointer()
    }

    fn reflect(&self) -> Value<'_> {
        (**self).reflect()
    }
}

impl<T: Reflect> Reflect for Arc<T> {
    fn type_shape() -> TypeShape {
        T::type_shape().pointer()
    }

    fn reflect(&self) -> Value<'_> {
        (**self).reflect()
    }
}

impl Reflect for Box<dyn Record> {
    fn type_shape() -> TypeShape {
        TypeShape::dyn_record().pointer()
    }

    fn reflect(&self) -> Value<'_> {
        Value::Record(&**self)
    }
}

impl<T: Reflect> Sequence for Vec<T> {
    fn len(&self) -> usize {
        <[T]>::len(self)
    }

    fn item(&self, index: usize) -> Value<'_> {
        self.get(index).map_or(Value::Nil, |item| item.reflect())
    }

    fn items_are_pointers(&self) -> bool {
        T::type_shape().is_pointer()
    }
}

impl<T: Reflect> Reflect for Vec<T> {
    fn type_shape() -> TypeShape {
        TypeShape::sequence(Kind::Slice, T::type_shape().kind())
    }

    fn reflect(&self) -> Value<'_> {
        Value::Slice(self)
    }
}

impl<T: Reflect, const N: usize> Sequence for [T; N] {
    fn len(&self) -> usize {
        N
    }

    fn item(&self, index: usize) -> Value<'_> {
        self.get(index).map_or(Value::Nil, |item| item.reflect())
    }

    fn items_are_pointers(&self) -> bool {
        T::type_shape().is_pointer()
    }
}

impl<T: Reflect, const N: usize> Reflect for [T; N] {
    fn type_shape() -> TypeShape {
        TypeShape::sequence(Kind::Array, T::type_shape().kind())
    }

    fn reflect(&self) -> Value<'_> {
        Value::Array(self)
    }
}

impl<K, V, S> Reflect for HashMap<K, V, S> {
    fn type_shape() -> TypeShape {
        TypeShape::scalar(Kind::Map)
    }

    fn reflect(&self) -> Value<'_> {
        Value::Map(self.len())
    }
}

impl<K, V> Reflect for BTreeMap<K, V> {
    fn type_shape() -> TypeShape {
        TypeShape::scalar(Kind::Map)
    }

    fn reflect(&self) -> Value<'_> {
        Value::Map(self.len())
    }
}

impl<T, S> Reflect for HashSet<T, S> {
    fn type_shape() -> TypeShape {
        TypeShape::scalar(Kind::Map)
    }

    fn reflect(&self) -> Value<'_> {
        Value::Map(self.len())
    }
}

impl<T> Reflect for BTreeSet<T> {
    fn type_shape() -> TypeShape {
        TypeShape::scalar(Kind::Map)
    }

    fn reflect(&self) -> Value<'_> {
        Value::Map(self.len())
    }
}

macro_rules! reflect_opaque {
    ($([$($generics:tt)*] $ty:ty),+ $(,)?) => {
        $(
            impl<$($generics)*> Reflect for $ty {
                fn type_shape() -> TypeShape {
                    TypeShape::opaque()
                }

                fn reflect(&self) -> Value<'_> {
                    Value::Opaque
                }
            }
        )+
    };
}

reflect_opaque!(
    [] (),
    [T] Sender<T>,
    [T] SyncSender<T>,
    [T] Receiver<T>,
    [T: ?Sized] PhantomData<T>,
    [R] fn() -> R,
    [R, A] fn(A) -> R,
    [R, A, B] fn(A, B) -> R,
    [R, A, B, C] fn(A, B, C) -> R,
);
