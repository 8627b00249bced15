//! # Rule Compiler
//!
//! Turns a [`RecordShape`] into a [`CompiledRuleSet`] and inserts it into
//! the cache. The record's own tags are parsed first, then every nested
//! record with a statically known type is compiled, behind pointers or
//! not, so a parent is never visible before its children.
//!
//! Two kinds of field are left unresolved (`nested_key == None`):
//! `Box<dyn Record>` fields, and fields whose type is already being
//! compiled further up (self-reference). Traversal resolves them on first
//! non-nil use with the same naming rule.
//!
//! Callers must hold [`RuleCache::lock_compilation`] for the duration.

use std::any::TypeId;
use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::cache::RuleCache;
use crate::constraint::Constraint;
use crate::error::CompileError;
use crate::reflect::{FieldShape, Kind, RecordShape};
use crate::rulemap::{RuleEntry, RuleMap};
use crate::ruleset::{CompiledRuleSet, FieldDescriptor, RuleSource};
use crate::tag::{parse_tag, FieldContext};

/// Fragment reported for a nested rule map that cannot apply.
const NESTED_FRAGMENT: &str = "<nested>";

/// Descriptors, constraints and nested keys, one entry per field.
type CompiledFields = (Vec<FieldDescriptor>, Vec<Vec<Constraint>>, Vec<Option<String>>);

#[derive(Clone, Copy)]
enum Rules<'m> {
    Tags,
    Map(&'m RuleMap),
}

pub(crate) struct Compiler<'c> {
    cache: &'c RuleCache,
    in_progress: HashSet<TypeId>,
}

impl<'c> Compiler<'c> {
    pub(crate) fn new(cache: &'c RuleCache) -> Self {
        Self {
            cache,
            in_progress: HashSet::new(),
        }
    }

    /// Compiles `shape` from its field tags and stores it under `key`.
    pub(crate) fn compile_tags(
        &mut self,
        key: String,
        shape: &RecordShape,
    ) -> Result<Arc<CompiledRuleSet>, CompileError> {
        self.compile(key, shape, Rules::Tags)
    }

    /// Compiles `shape` from `rules` instead of its tags.
    pub(crate) fn compile_map(
        &mut self,
        key: String,
        shape: &RecordShape,
        rules: &RuleMap,
    ) -> Result<Arc<CompiledRuleSet>, CompileError> {
        self.compile(key, shape, Rules::Map(rules))
    }

    fn compile(
        &mut self,
        key: String,
        shape: &RecordShape,
        rules: Rules<'_>,
    ) -> Result<Arc<CompiledRuleSet>, CompileError> {
        let record_type = *shape.record_type();

        let source = match rules {
            Rules::Tags => RuleSource::Tags,
            Rules::Map(map) => {
                if let Some((field, _)) = map.iter().find(|(name, _)| shape.field_by_name(name).is_none()) {
                    return Err(CompileError::UnknownField {
                        record: key,
                        field: field.clone(),
                    });
                }
                RuleSource::Map
            }
        };

        self.in_progress.insert(record_type.type_id());
        let compiled = self.compile_fields(&key, shape, rules);
        self.in_progress.remove(&record_type.type_id());
        let (fields, constraints, nested) = compiled?;

        let set = CompiledRuleSet::new(key, record_type, source, fields, constraints, nested);
        debug!(
            key = set.key(),
            fields = set.fields().len(),
            constraints = set.constraint_count(),
            source = ?set.source(),
            "compiled rule set"
        );
        Ok(self.cache.insert(set))
    }

    fn compile_fields(
        &mut self,
        key: &str,
        shape: &RecordShape,
        rules: Rules<'_>,
    ) -> Result<CompiledFields, CompileError> {
        let count = shape.fields().len();
        let mut fields = Vec::with_capacity(count);
        let mut constraints = Vec::with_capacity(count);
        let mut nested_maps = Vec::with_capacity(count);

        // Every tag of this record parses before any nested record is
        // compiled, so a bad tag here leaves the cache untouched.
        for field in shape.fields() {
            let ty = field.ty();
            let ctx = FieldContext {
                record: key,
                field: field.name(),
                kind: ty.kind(),
                elem: ty.elem(),
                declared_pointer: ty.is_pointer(),
            };

            let (tag, nested_map) = match rules {
                Rules::Tags => (field.tag(), None),
                Rules::Map(map) => match map.get(field.name()) {
                    Some(RuleEntry::Tag(tag)) => (Some(tag.as_str()), None),
                    Some(RuleEntry::Nested(nested_map)) => (None, Some(nested_map)),
                    None => (None, None),
                },
            };

            constraints.push(parse_tag(tag.unwrap_or(""), &ctx)?);
            nested_maps.push(nested_map);
            fields.push(FieldDescriptor::from_shape(field));
        }

        let mut nested = Vec::with_capacity(count);
        for (field, nested_map) in shape.fields().iter().zip(nested_maps) {
            nested.push(self.nested_rules(key, field, nested_map)?);
        }

        Ok((fields, constraints, nested))
    }

    /// Compiles the nested record behind `field`, if it can be resolved
    /// statically, and returns its key.
    fn nested_rules(
        &mut self,
        parent: &str,
        field: &FieldShape,
        rules: Option<&RuleMap>,
    ) -> Result<Option<String>, CompileError> {
        let ty = field.ty();

        if let Some(rules) = rules {
            let Some(shape) = ty.record_shape() else {
                return Err(CompileError::UnsupportedRule {
                    record: parent.to_string(),
                    field: field.name().to_string(),
                    fragment: NESTED_FRAGMENT.to_string(),
                    reason: format!(
                        "nested rules need a field of statically known record type, found {}",
                        ty.kind()
                    ),
                });
            };
            let key = format!("{parent}#{}", field.index());
            self.compile_map(key.clone(), &shape, rules)?;
            return Ok(Some(key));
        }

        if ty.kind() != Kind::Record {
            return Ok(None);
        }
        let Some(shape) = ty.record_shape() else {
            return Ok(None);
        };
        let record_type = shape.record_type();
        if self.in_progress.contains(&record_type.type_id()) {
            return Ok(None);
        }

        let key = self.cache.nested_key(parent, field.index(), record_type);
        if self.cache.get_for(&key, record_type).is_none() {
            self.compile_tags(key.clone(), &shape)?;
        }
        Ok(Some(key))
    }
}
