//! # Validator
//!
//! Public entry points and the traversal engine.
//!
//! ## Traversal
//!
//! For every field in declaration order: evaluate all of its constraints
//! against the current value (no short-circuit), then, if the value is a
//! record, descend with the nested rule set and the extended path
//! `<path>.<field>`. Violations from every field and every level are
//! appended to one report.
//!
//! Nested rule sets come from the parent's compiled key when the nested
//! type was known statically, behind pointers or not. `Box<dyn Record>`
//! fields and self-referential fields have no compiled key; they are
//! resolved from the runtime value under the same naming rule the
//! compiler uses, compiling on first use.

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::cache::RuleCache;
use crate::compiler::Compiler;
use crate::config::ValidatorConfig;
use crate::error::{ValidateError, Violation, Violations};
use crate::reflect::{Record, Reflect, Value};
use crate::rulemap::RuleMap;
use crate::ruleset::CompiledRuleSet;

/// Tag-driven record validator with its own rule cache.
///
/// Cheap to share: every operation takes `&self`, and the validator is
/// `Send + Sync`.
#[derive(Debug, Default)]
pub struct Validator {
    config: ValidatorConfig,
    cache: RuleCache,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ValidatorConfig) -> Self {
        Self {
            config,
            cache: RuleCache::new(),
        }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Read-only view of the compiled rule sets.
    pub fn cache(&self) -> &RuleCache {
        &self.cache
    }

    /// Validates `value`, compiling its rules on first use.
    ///
    /// Violation paths start at the record's type name. Returns
    /// [`ValidateError::Violations`] when any constraint fails.
    pub fn validate_struct<T: Reflect + ?Sized>(&self, value: &T) -> Result<(), ValidateError> {
        let record = root_record(value)?;
        self.validate_record(record, record.record_type().name())
    }

    /// Like [`Validator::validate_struct`], with `root` as the first path
    /// segment.
    pub fn validate_named<T: Reflect + ?Sized>(&self, value: &T, root: &str) -> Result<(), ValidateError> {
        let record = root_record(value)?;
        self.validate_record(record, root)
    }

    /// Compiles and caches rules for the type of `value`, replacing any
    /// existing entry for that type.
    pub fn register_struct<T: Reflect + ?Sized>(&self, value: &T) -> Result<(), ValidateError> {
        let record = root_record(value)?;
        let _guard = self.cache.lock_compilation();
        let key = self.cache.root_key(&record.record_type());
        Compiler::new(&self.cache).compile_tags(key, &record.shape())?;
        Ok(())
    }

    /// Compiles and caches rules for the type of `value` from `rules`
    /// instead of its tags.
    pub fn register_map_rule<T: Reflect + ?Sized>(
        &self,
        value: &T,
        rules: &RuleMap,
    ) -> Result<(), ValidateError> {
        let record = root_record(value)?;
        let _guard = self.cache.lock_compilation();
        let key = self.cache.root_key(&record.record_type());
        Compiler::new(&self.cache).compile_map(key, &record.shape(), rules)?;
        Ok(())
    }

    fn validate_record(&self, record: &dyn Record, root: &str) -> Result<(), ValidateError> {
        let rules = self.root_rules(record)?;
        let mut violations = Vec::new();
        self.traverse(record, &rules, root, 0, &mut violations)?;

        match Violations::from_vec(violations) {
            None => Ok(()),
            Some(violations) => {
                debug!(root, count = violations.len(), "validation found violations");
                Err(ValidateError::Violations(violations))
            }
        }
    }

    fn root_rules(&self, record: &dyn Record) -> Result<Arc<CompiledRuleSet>, ValidateError> {
        let record_type = record.record_type();
        if let Some(rules) = self.cache.lookup_root(&record_type) {
            trace!(key = rules.key(), "rule cache hit");
            return Ok(rules);
        }

        let _guard = self.cache.lock_compilation();
        if let Some(rules) = self.cache.lookup_root(&record_type) {
            trace!(key = rules.key(), "rule cache hit after wait");
            return Ok(rules);
        }
        let key = self.cache.root_key(&record_type);
        Ok(Compiler::new(&self.cache).compile_tags(key, &record.shape())?)
    }

    /// Rule set for the record held by field `index` of `parent`.
    fn nested_rules(
        &self,
        parent: &CompiledRuleSet,
        index: usize,
        record: &dyn Record,
    ) -> Result<Arc<CompiledRuleSet>, ValidateError> {
        let record_type = record.record_type();
        if let Some(rules) = parent
            .nested_key(index)
            .and_then(|key| self.cache.get_for(key, &record_type))
        {
            return Ok(rules);
        }

        let key = self.cache.nested_key(parent.key(), index, &record_type);
        if let Some(rules) = self.cache.get_for(&key, &record_type) {
            trace!(key = rules.key(), "rule cache hit");
            return Ok(rules);
        }

        let _guard = self.cache.lock_compilation();
        let key = self.cache.nested_key(parent.key(), index, &record_type);
        if let Some(rules) = self.cache.get_for(&key, &record_type) {
            return Ok(rules);
        }
        trace!(parent = parent.key(), index, key = %key, "compiling nested record on first use");
        Ok(Compiler::new(&self.cache).compile_tags(key, &record.shape())?)
    }

    fn traverse(
        &self,
        record: &dyn Record,
        rules: &CompiledRuleSet,
        path: &str,
        depth: usize,
        out: &mut Vec<Violation>,
    ) -> Result<(), ValidateError> {
        for (index, field) in rules.fields().iter().enumerate() {
            let value = record.field(field.index());
            let field_path = format!("{path}.{}", field.name());

            for constraint in rules.constraints(index) {
                if !constraint.check(&value) {
                    out.push(Violation::new(field_path.as_str(), constraint.fragment()));
                }
            }

            if let Value::Record(nested) = value {
                if depth >= self.config.max_depth {
                    warn!(path = %field_path, limit = self.config.max_depth, "record nesting exceeds depth limit");
                    return Err(ValidateError::DepthExceeded {
                        path: field_path,
                        limit: self.config.max_depth,
                    });
                }
                let nested_rules = self.nested_rules(rules, index, nested)?;
                self.traverse(nested, &nested_rules, &field_path, depth + 1, out)?;
            }
        }
        Ok(())
    }
}

/// The record behind `value`, pointers followed.
fn root_record<T: Reflect + ?Sized>(value: &T) -> Result<&dyn Record, ValidateError> {
    match value.reflect() {
        Value::Record(record) => Ok(record),
        other => Err(ValidateError::WrongType { found: other.kind() }),
    }
}
