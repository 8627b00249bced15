//! Immutable compiled rules for one record type.

use crate::constraint::Constraint;
use crate::reflect::{FieldShape, Kind, RecordType};

/// Where a rule set's constraints came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSource {
    /// `#[validate(...)]` tags on the record's fields.
    Tags,
    /// A caller-supplied [`RuleMap`](crate::RuleMap).
    Map,
}

/// A field's declared name, type and visibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    name: &'static str,
    index: usize,
    exported: bool,
    pointer_depth: u8,
    kind: Kind,
    elem: Option<Kind>,
}

impl FieldDescriptor {
    pub(crate) fn from_shape(shape: &FieldShape) -> Self {
        Self {
            name: shape.name(),
            index: shape.index(),
            exported: shape.exported(),
            pointer_depth: shape.ty().pointer_depth(),
            kind: shape.ty().kind(),
            elem: shape.ty().elem(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn exported(&self) -> bool {
        self.exported
    }

    pub fn pointer_depth(&self) -> u8 {
        self.pointer_depth
    }

    /// Dereferenced declared kind.
    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn elem(&self) -> Option<Kind> {
        self.elem
    }
}

/// Field descriptors, per-field constraints and nested keys for one
/// record type. Built once by the compiler; shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct CompiledRuleSet {
    key: String,
    record_type: RecordType,
    source: RuleSource,
    fields: Vec<FieldDescriptor>,
    constraints: Vec<Vec<Constraint>>,
    nested: Vec<Option<String>>,
}

impl CompiledRuleSet {
    pub(crate) fn new(
        key: String,
        record_type: RecordType,
        source: RuleSource,
        fields: Vec<FieldDescriptor>,
        constraints: Vec<Vec<Constraint>>,
        nested: Vec<Option<String>>,
    ) -> Self {
        debug_assert_eq!(fields.len(), constraints.len());
        debug_assert_eq!(fields.len(), nested.len());
        Self {
            key,
            record_type,
            source,
            fields,
            constraints,
            nested,
        }
    }

    /// The cache key this set is stored under.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn record_type(&self) -> &RecordType {
        &self.record_type
    }

    pub fn source(&self) -> RuleSource {
        self.source
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Constraints of field `index`, in tag order. Empty when untagged.
    pub fn constraints(&self, index: usize) -> &[Constraint] {
        self.constraints.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Cache key of the nested rule set for field `index`, when it was
    /// resolved at compile time.
    pub fn nested_key(&self, index: usize) -> Option<&str> {
        self.nested.get(index).and_then(|key| key.as_deref())
    }

    /// Total constraints across all fields.
    pub fn constraint_count(&self) -> usize {
        self.constraints.iter().map(Vec::len).sum()
    }
}
