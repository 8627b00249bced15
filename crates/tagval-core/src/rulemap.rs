//! Map-sourced rules for types that cannot carry tags.
//!
//! A [`RuleMap`] names fields and gives each either a tag string in the
//! usual grammar or a nested map for a record-typed field. It
//! deserializes from any `serde` format; a string is a tag, an object is a
//! nested map:
//!
//! ```json
//! { "qty": "gt=0", "shipping": { "zip": "len=5" } }
//! ```

use std::collections::btree_map;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Rules for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleEntry {
    /// Tag text, e.g. `gt=0,ls=100`.
    Tag(String),
    /// Rules for the fields of a nested record.
    Nested(RuleMap),
}

/// Field name to [`RuleEntry`], ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleMap {
    entries: BTreeMap<String, RuleEntry>,
}

impl RuleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`RuleMap::insert`] for a tag.
    pub fn tag(mut self, field: impl Into<String>, tag: impl Into<String>) -> Self {
        self.insert(field, RuleEntry::Tag(tag.into()));
        self
    }

    /// Builder form of [`RuleMap::insert`] for a nested map.
    pub fn nested(mut self, field: impl Into<String>, rules: RuleMap) -> Self {
        self.insert(field, RuleEntry::Nested(rules));
        self
    }

    /// Sets the rules for `field`, returning the previous entry.
    pub fn insert(&mut self, field: impl Into<String>, entry: RuleEntry) -> Option<RuleEntry> {
        self.entries.insert(field.into(), entry)
    }

    pub fn get(&self, field: &str) -> Option<&RuleEntry> {
        self.entries.get(field)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, RuleEntry> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a RuleMap {
    type Item = (&'a String, &'a RuleEntry);
    type IntoIter = btree_map::Iter<'a, String, RuleEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<K: Into<String>> FromIterator<(K, RuleEntry)> for RuleMap {
    fn from_iter<I: IntoIterator<Item = (K, RuleEntry)>>(iter: I) -> Self {
        let mut map = RuleMap::new();
        for (field, entry) in iter {
            map.insert(field, entry);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_lookup() {
        let rules = RuleMap::new()
            .tag("qty", "gt=0")
            .nested("shipping", RuleMap::new().tag("zip", "len=5"));
        assert_eq!(rules.len(), 2);
        assert_eq!(rules.get("qty"), Some(&RuleEntry::Tag("gt=0".into())));
        let Some(RuleEntry::Nested(shipping)) = rules.get("shipping") else {
            panic!("expected nested map");
        };
        assert_eq!(shipping.get("zip"), Some(&RuleEntry::Tag("len=5".into())));
        assert!(rules.get("missing").is_none());
    }

    #[test]
    fn test_deserialize_strings_and_objects() {
        let rules: RuleMap =
            serde_json::from_str(r#"{ "qty": "gt=0", "shipping": { "zip": "len=5" } }"#).unwrap();
        let expected = RuleMap::new()
            .tag("qty", "gt=0")
            .nested("shipping", RuleMap::new().tag("zip", "len=5"));
        assert_eq!(rules, expected);
    }

    #[test]
    fn test_serialize_is_plain_object() {
        let rules = RuleMap::new().tag("b", "required").tag("a", "len=2");
        let json = serde_json::to_string(&rules).unwrap();
        assert_eq!(json, r#"{"a":"len=2","b":"required"}"#);
    }

    #[test]
    fn test_non_string_leaf_is_rejected() {
        assert!(serde_json::from_str::<RuleMap>(r#"{ "qty": 5 }"#).is_err());
    }

    #[test]
    fn test_iteration_is_ordered_by_field_name() {
        let rules: RuleMap = [("z", RuleEntry::Tag("gt=1".into())), ("a", RuleEntry::Tag("ls=1".into()))]
            .into_iter()
            .collect();
        let names: Vec<&str> = rules.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["a", "z"]);
    }
}
