//! Dotted-key ⇄ nested-mapping transform for form values
//!
//! The form layer works with flat keys like `"tracking.threshold"`; the
//! persisted document nests them as `tracking: {threshold: …}`. The job
//! schema only ever nests one level deep, so the tree type enforces exactly
//! that: a top-level entry is either a scalar or a group of fields, nothing
//! deeper.

use indexmap::IndexMap;
use serde_yaml::{Mapping, Value};

/// A top-level form entry: a bare scalar or a one-level group of fields.
///
/// Field values inside a group are opaque — the codec never descends into
/// them, so a field may itself hold a mapping and it passes through intact.
#[derive(Clone, Debug, PartialEq)]
pub enum FormEntry {
    Scalar(Value),
    Group(IndexMap<String, Value>),
}

/// Insertion-ordered form values, at most one level deep by construction.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormTree {
    entries: IndexMap<String, FormEntry>,
}

impl FormTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one flat entry.
    ///
    /// A key containing a `.` splits at the *first* dot into group and field
    /// (`"a.b.c"` lands in group `"a"`, field `"b.c"`); a dot-free key is a
    /// top-level scalar. A group key arriving after an identical scalar key
    /// silently replaces the scalar, and vice versa — an accepted footgun
    /// inherited from the form layer, kept rather than remediated.
    pub fn insert(&mut self, key: &str, value: Value) {
        match key.split_once('.') {
            Some((group, field)) => {
                let entry = self
                    .entries
                    .entry(group.to_owned())
                    .or_insert_with(|| FormEntry::Group(IndexMap::new()));
                if let FormEntry::Scalar(_) = entry {
                    *entry = FormEntry::Group(IndexMap::new());
                }
                if let FormEntry::Group(fields) = entry {
                    fields.insert(field.to_owned(), value);
                }
            }
            None => {
                self.entries.insert(key.to_owned(), FormEntry::Scalar(value));
            }
        }
    }

    /// Look up one flat entry.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match key.split_once('.') {
            Some((group, field)) => match self.entries.get(group)? {
                FormEntry::Group(fields) => fields.get(field),
                FormEntry::Scalar(_) => None,
            },
            None => match self.entries.get(key)? {
                FormEntry::Scalar(value) => Some(value),
                FormEntry::Group(_) => None,
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Unflatten: build a tree from flat dotted keys.
    pub fn from_flat(flat: &IndexMap<String, Value>) -> Self {
        let mut tree = Self::new();
        for (key, value) in flat {
            tree.insert(key, value.clone());
        }
        tree
    }

    /// Flatten: emit one `"group.field"` entry per group field and pass
    /// top-level scalars through unchanged.
    ///
    /// `to_flat(from_flat(x)) == x` for any one-level input without
    /// multi-dot keys; the reverse direction holds no such guarantee.
    pub fn to_flat(&self) -> IndexMap<String, Value> {
        let mut flat = IndexMap::new();
        for (key, entry) in &self.entries {
            match entry {
                FormEntry::Scalar(value) => {
                    flat.insert(key.clone(), value.clone());
                }
                FormEntry::Group(fields) => {
                    for (field, value) in fields {
                        flat.insert(format!("{key}.{field}"), value.clone());
                    }
                }
            }
        }
        flat
    }

    /// Nested YAML mapping, as written to the document's `Jobs` section.
    pub fn to_value(&self) -> Value {
        let mut out = Mapping::new();
        for (key, entry) in &self.entries {
            let value = match entry {
                FormEntry::Scalar(value) => value.clone(),
                FormEntry::Group(fields) => Value::Mapping(
                    fields
                        .iter()
                        .map(|(k, v)| (Value::String(k.clone()), v.clone()))
                        .collect(),
                ),
            };
            out.insert(Value::String(key.clone()), value);
        }
        Value::Mapping(out)
    }

    /// Rebuild a tree from a loaded `Jobs` mapping.
    ///
    /// Mapping children become groups, everything else a scalar. Form keys
    /// are always strings; entries with non-string keys are skipped.
    pub fn from_value(value: &Value) -> Self {
        let mut tree = Self::new();
        let Value::Mapping(map) = value else {
            return tree;
        };
        for (key, value) in map {
            let Some(key) = key.as_str() else { continue };
            match value {
                Value::Mapping(fields) => {
                    let fields = fields
                        .iter()
                        .filter_map(|(k, v)| Some((k.as_str()?.to_owned(), v.clone())))
                        .collect();
                    tree.entries.insert(key.to_owned(), FormEntry::Group(fields));
                }
                other => {
                    tree.entries
                        .insert(key.to_owned(), FormEntry::Scalar(other.clone()));
                }
            }
        }
        tree
    }
}
