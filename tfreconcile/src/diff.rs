//! Change detection between a prior instance and a new configuration
//!
//! [`Diff`] partitions changed attributes into force-new and in-place groups.
//! [`ChangeSet`] is what an update hook receives; it derives tag and nested
//! block deltas so each hook can issue one API call per change group.

use crate::error::Result;
use crate::schema::Schema;
use crate::value::{AttributeBag, Value};
use std::collections::BTreeMap;

/// Structural equality. Sets compare without regard to order, numbers compare
/// numerically across Int and Float
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Unknown, Value::Unknown) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Float(a), Value::Float(b)) => a == b,
        (Value::Int(i), Value::Float(f)) | (Value::Float(f), Value::Int(i)) => {
            int_equals_float(*i, *f)
        }
        (Value::String(a), Value::String(b)) => a == b,
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| values_equal(x, y))
        }
        (Value::Set(a), Value::Set(b) | Value::List(b)) | (Value::List(a), Value::Set(b)) => {
            unordered_equal(a, b)
        }
        (Value::Map(a), Value::Map(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).is_some_and(|v2| values_equal(v, v2)))
        }
        _ => false,
    }
}

/// Exact: the float must be integral, inside the i64 range and convert to
/// the same i64
fn int_equals_float(i: i64, f: f64) -> bool {
    const LIMIT: f64 = 9_223_372_036_854_775_808.0; // 2^63
    (-LIMIT..LIMIT).contains(&f) && f.fract() == 0.0 && f as i64 == i
}

fn unordered_equal(a: &[Value], b: &[Value]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut used = vec![false; b.len()];
    a.iter().all(|x| {
        match b
            .iter()
            .enumerate()
            .position(|(i, y)| !used[i] && values_equal(x, y))
        {
            Some(i) => {
                used[i] = true;
                true
            }
            None => false,
        }
    })
}

/// Null and empty collections are the same configuration
fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::List(items) | Value::Set(items) => items.is_empty(),
        Value::Map(entries) => entries.is_empty(),
        _ => false,
    }
}

fn changed(old: &Value, new: &Value) -> bool {
    if new.is_unknown() {
        return false;
    }
    if is_empty(old) && is_empty(new) {
        return false;
    }
    !values_equal(old, new)
}

/// Names of changed user-settable attributes and blocks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    pub in_place: Vec<String>,
    pub force_new: Vec<String>,
}

impl Diff {
    pub fn compute(schema: &Schema, old: &AttributeBag, new: &AttributeBag) -> Self {
        let mut diff = Diff::default();

        for attr in schema
            .block
            .attributes
            .iter()
            .filter(|a| a.is_user_settable())
        {
            let new_value = new.get(&attr.name).unwrap_or(&Value::Null);
            // Optional+Computed left unset keeps whatever the remote side holds
            if attr.computed && new_value.is_null() {
                continue;
            }
            let old_value = old.get(&attr.name).unwrap_or(&Value::Null);
            if changed(old_value, new_value) {
                diff.push(&attr.name, attr.force_new);
            }
        }

        for block in &schema.block.block_types {
            let new_value = new.get(&block.type_name).unwrap_or(&Value::Null);
            if block.computed && new_value.is_null() {
                continue;
            }
            let old_value = old.get(&block.type_name).unwrap_or(&Value::Null);
            if changed(old_value, new_value) {
                diff.push(&block.type_name, block.force_new);
            }
        }

        diff
    }

    fn push(&mut self, name: &str, force_new: bool) {
        if force_new {
            self.force_new.push(name.to_string());
        } else {
            self.in_place.push(name.to_string());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.in_place.is_empty() && self.force_new.is_empty()
    }

    pub fn requires_replace(&self) -> bool {
        !self.force_new.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.in_place.iter().chain(self.force_new.iter()).any(|n| n == name)
    }

    /// All changed names, in-place first
    pub fn changed(&self) -> Vec<String> {
        self.in_place
            .iter()
            .chain(self.force_new.iter())
            .cloned()
            .collect()
    }
}

/// Key/value changes of a tag map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDelta {
    /// Keys present only in the old map, with their old values
    pub remove: BTreeMap<String, String>,
    /// Keys added or whose value changed, with their new values
    pub upsert: BTreeMap<String, String>,
}

impl TagDelta {
    pub fn compute(old: &BTreeMap<String, String>, new: &BTreeMap<String, String>) -> Self {
        let remove = old
            .iter()
            .filter(|(k, _)| !new.contains_key(*k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let upsert = new
            .iter()
            .filter(|(k, v)| old.get(*k) != Some(*v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self { remove, upsert }
    }

    pub fn is_empty(&self) -> bool {
        self.remove.is_empty() && self.upsert.is_empty()
    }
}

/// Nested block elements present on only one side
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockDelta {
    pub added: Vec<AttributeBag>,
    pub removed: Vec<AttributeBag>,
}

impl BlockDelta {
    pub fn compute(old: &[AttributeBag], new: &[AttributeBag]) -> Self {
        let contains = |haystack: &[AttributeBag], needle: &AttributeBag| {
            let needle = Value::from(needle.clone());
            haystack
                .iter()
                .any(|b| values_equal(&Value::from(b.clone()), &needle))
        };

        Self {
            added: new.iter().filter(|b| !contains(old, b)).cloned().collect(),
            removed: old.iter().filter(|b| !contains(new, b)).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// What an update hook sees: the prior bag, the new configuration and the diff
#[derive(Debug, Clone)]
pub struct ChangeSet<'a> {
    pub old: &'a AttributeBag,
    pub new: &'a AttributeBag,
    pub diff: Diff,
}

impl<'a> ChangeSet<'a> {
    pub fn new(old: &'a AttributeBag, new: &'a AttributeBag, diff: Diff) -> Self {
        Self { old, new, diff }
    }

    pub fn has_change(&self, name: &str) -> bool {
        self.diff.contains(name)
    }

    pub fn has_changes(&self, names: &[&str]) -> bool {
        names.iter().any(|n| self.has_change(n))
    }

    pub fn tag_delta(&self, name: &str) -> Result<TagDelta> {
        Ok(TagDelta::compute(
            &self.old.get_string_map(name)?,
            &self.new.get_string_map(name)?,
        ))
    }

    pub fn block_delta(&self, name: &str) -> Result<BlockDelta> {
        Ok(BlockDelta::compute(
            &self.old.get_blocks(name)?,
            &self.new.get_blocks(name)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeBuilder, AttributeType, NestedBlockBuilder, SchemaBuilder};

    fn tags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn schema() -> Schema {
        SchemaBuilder::new()
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("cidr", AttributeType::String)
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("enterprise_project_id", AttributeType::String)
                    .optional()
                    .computed()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("tags", AttributeType::map_of(AttributeType::String))
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("status", AttributeType::String)
                    .computed()
                    .build(),
            )
            .block(
                NestedBlockBuilder::set("networks")
                    .attribute(
                        AttributeBuilder::new("id", AttributeType::String)
                            .required()
                            .build(),
                    )
                    .build(),
            )
            .build()
    }

    fn prior() -> AttributeBag {
        AttributeBag::new()
            .with("name", "vpc-a")
            .with("cidr", "10.0.0.0/16")
            .with("enterprise_project_id", "0")
            .with("status", "OK")
            .with("tags", Value::string_map(&tags(&[("a", "1")])))
    }

    #[test]
    fn large_ints_compare_exactly_against_floats() {
        let big = 1i64 << 53;
        assert!(values_equal(&Value::Int(big), &Value::Float(big as f64)));
        // 2^53 + 1 rounds to 2^53 as a float
        assert!(!values_equal(&Value::Int(big + 1), &Value::Float(big as f64)));
        assert!(!values_equal(&Value::Int(i64::MAX), &Value::Float(i64::MAX as f64)));
        assert!(!values_equal(&Value::Int(1), &Value::Float(f64::NAN)));
    }

    #[test]
    fn values_equal_handles_all_types() {
        assert!(values_equal(&Value::Int(42), &Value::Float(42.0)));
        assert!(values_equal(&Value::Float(42.0), &Value::Int(42)));
        assert!(!values_equal(&Value::Int(42), &Value::Float(42.5)));
        assert!(!values_equal(&Value::Int(42), &Value::Int(43)));
        assert!(values_equal(&Value::Bool(true), &Value::Bool(true)));
        assert!(!values_equal(&Value::from("a"), &Value::Null));

        let list1 = Value::List(vec![Value::from("a"), Value::from("b")]);
        let list2 = Value::List(vec![Value::from("b"), Value::from("a")]);
        assert!(!values_equal(&list1, &list2));

        let set1 = Value::Set(vec![Value::from("a"), Value::from("b")]);
        let set2 = Value::Set(vec![Value::from("b"), Value::from("a")]);
        let set3 = Value::Set(vec![Value::from("a"), Value::from("a")]);
        assert!(values_equal(&set1, &set2));
        assert!(!values_equal(&set1, &set3));

        let map1 = Value::string_map(&tags(&[("key", "value")]));
        let map2 = Value::string_map(&tags(&[("key", "different")]));
        assert!(values_equal(&map1, &map1.clone()));
        assert!(!values_equal(&map1, &map2));
    }

    #[test]
    fn identical_config_has_no_diff() {
        let diff = Diff::compute(&schema(), &prior(), &prior());
        assert!(diff.is_empty());
    }

    #[test]
    fn force_new_and_in_place_are_partitioned() {
        let new = prior().with("name", "vpc-b").with("cidr", "10.1.0.0/16");
        let diff = Diff::compute(&schema(), &prior(), &new);

        assert_eq!(diff.in_place, vec!["name".to_string()]);
        assert_eq!(diff.force_new, vec!["cidr".to_string()]);
        assert!(diff.requires_replace());
    }

    #[test]
    fn unset_optional_computed_is_not_a_change() {
        let mut new = prior();
        new.remove("enterprise_project_id");
        new.remove("status");
        let diff = Diff::compute(&schema(), &prior(), &new);
        assert!(diff.is_empty(), "{:?}", diff);

        let explicit = prior().with("enterprise_project_id", "ep-2");
        let diff = Diff::compute(&schema(), &prior(), &explicit);
        assert_eq!(diff.force_new, vec!["enterprise_project_id".to_string()]);
    }

    #[test]
    fn null_and_empty_collections_are_equal() {
        let old = prior().with("tags", Value::Null);
        let new = prior().with("tags", Value::Map(BTreeMap::new()));
        assert!(Diff::compute(&schema(), &old, &new).is_empty());
    }

    #[test]
    fn tag_delta_removes_from_old_and_upserts_from_new() {
        let delta = TagDelta::compute(
            &tags(&[("a", "1"), ("b", "2")]),
            &tags(&[("b", "3"), ("c", "4")]),
        );

        assert_eq!(delta.remove, tags(&[("a", "1")]));
        assert_eq!(delta.upsert, tags(&[("b", "3"), ("c", "4")]));
    }

    #[test]
    fn tag_delta_keeps_unchanged_keys() {
        let delta = TagDelta::compute(&tags(&[("a", "1")]), &tags(&[("a", "1")]));
        assert!(delta.is_empty());
    }

    #[test]
    fn change_set_exposes_deltas() {
        let old = prior().with(
            "networks",
            Value::blocks(vec![AttributeBag::new().with("id", "subnet-1")]),
        );
        let new = old
            .clone()
            .with("tags", Value::string_map(&tags(&[("b", "2")])))
            .with(
                "networks",
                Value::blocks(vec![AttributeBag::new().with("id", "subnet-2")]),
            );
        let diff = Diff::compute(&schema(), &old, &new);
        let changes = ChangeSet::new(&old, &new, diff);

        assert!(changes.has_change("tags"));
        assert!(changes.has_changes(&["name", "networks"]));
        assert!(!changes.has_change("name"));

        let tag_delta = changes.tag_delta("tags").unwrap();
        assert_eq!(tag_delta.remove, tags(&[("a", "1")]));
        assert_eq!(tag_delta.upsert, tags(&[("b", "2")]));

        let block_delta = changes.block_delta("networks").unwrap();
        assert_eq!(block_delta.added.len(), 1);
        assert_eq!(block_delta.removed[0].get_str("id").unwrap(), Some("subnet-1"));
    }
}
