//! Attribute values, default templates and per-entity overrides.
//!
//! Every entity class (vertex, edge, face, cell) has a default attribute
//! template. When an entity is created it captures the template that is
//! current at that moment as an immutable snapshot, and stores its own
//! values on top of it. Later changes to a template value only affect
//! entities created afterwards; names added to the template later are read
//! from the current template by every entity.
//!
//! Two storage policies are supported, chosen through [`MeshConfig`]:
//!
//! - [`AttributePolicy::CopyDefaults`]: the record holds the full merged map
//!   (template copied, then overrides applied).
//! - [`AttributePolicy::Sparse`]: the record holds only the overrides; reads
//!   fall back to the captured snapshot, then to the current template.
//!
//! Both policies read identically. They differ in memory use and in what is
//! written to data documents.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{MeshError, Result};

/// A dynamically typed attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Attr {
    /// Absent / null value.
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Heterogeneous list.
    List(Vec<Attr>),
}

impl Attr {
    /// Numeric view of the value (integers are widened).
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Attr::Float(x) => Some(x),
            Attr::Int(i) => Some(i as f64),
            _ => None,
        }
    }

    /// Boolean view of the value.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Attr::Bool(b) => Some(b),
            _ => None,
        }
    }

    /// Text view of the value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Attr::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Whether the value is [`Attr::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Attr::Null)
    }
}

impl From<f64> for Attr {
    fn from(v: f64) -> Self {
        Attr::Float(v)
    }
}

impl From<i64> for Attr {
    fn from(v: i64) -> Self {
        Attr::Int(v)
    }
}

impl From<i32> for Attr {
    fn from(v: i32) -> Self {
        Attr::Int(v as i64)
    }
}

impl From<bool> for Attr {
    fn from(v: bool) -> Self {
        Attr::Bool(v)
    }
}

impl From<&str> for Attr {
    fn from(v: &str) -> Self {
        Attr::Text(v.to_string())
    }
}

impl From<String> for Attr {
    fn from(v: String) -> Self {
        Attr::Text(v)
    }
}

impl<T: Into<Attr>> From<Vec<T>> for Attr {
    fn from(v: Vec<T>) -> Self {
        Attr::List(v.into_iter().map(Into::into).collect())
    }
}

/// Named attributes in deterministic order.
pub type AttrMap = BTreeMap<String, Attr>;

/// Build an [`AttrMap`] from `(name, value)` pairs.
///
/// ```
/// use topomesh::attr::{attrs, Attr};
///
/// let a = attrs([("x", Attr::from(1.0)), ("name", Attr::from("corner"))]);
/// assert_eq!(a["x"], Attr::Float(1.0));
/// ```
pub fn attrs<N: Into<String>>(pairs: impl IntoIterator<Item = (N, Attr)>) -> AttrMap {
    pairs.into_iter().map(|(n, v)| (n.into(), v)).collect()
}

/// How entity records store their attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttributePolicy {
    /// Copy the whole template into each record, then apply overrides.
    #[default]
    CopyDefaults,
    /// Store only the overrides.
    Sparse,
}

/// Construction-time configuration of a mesh, network or volmesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MeshConfig {
    /// Reject attribute names that are not declared in the template.
    pub strict_attributes: bool,

    /// Record storage policy.
    pub attribute_policy: AttributePolicy,
}

impl MeshConfig {
    /// Enable or disable strict attribute names.
    pub fn with_strict_attributes(mut self, strict: bool) -> Self {
        self.strict_attributes = strict;
        self
    }

    /// Set the record storage policy.
    pub fn with_policy(mut self, policy: AttributePolicy) -> Self {
        self.attribute_policy = policy;
        self
    }

    /// Shorthand for sparse storage.
    pub fn sparse(self) -> Self {
        self.with_policy(AttributePolicy::Sparse)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Record {
    /// Template snapshot captured at creation time.
    template: Arc<AttrMap>,
    /// Full map (CopyDefaults) or overrides only (Sparse).
    values: AttrMap,
}

/// Default template plus per-entity records for one entity class.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeStore<K: Ord + Copy + Debug> {
    kind: &'static str,
    defaults: Arc<AttrMap>,
    records: BTreeMap<K, Record>,
    config: MeshConfig,
}

impl<K: Ord + Copy + Debug> AttributeStore<K> {
    /// Create a store with an initial template.
    pub fn new(kind: &'static str, defaults: AttrMap, config: MeshConfig) -> Self {
        Self {
            kind,
            defaults: Arc::new(defaults),
            records: BTreeMap::new(),
            config,
        }
    }

    /// The current default template.
    #[inline]
    pub fn defaults(&self) -> &AttrMap {
        &self.defaults
    }

    /// The configuration this store enforces.
    #[inline]
    pub fn config(&self) -> MeshConfig {
        self.config
    }

    /// Merge `mapping` into the template. Existing records keep their snapshot.
    pub fn update_defaults(&mut self, mapping: AttrMap) {
        let mut next = (*self.defaults).clone();
        next.extend(mapping);
        self.defaults = Arc::new(next);
    }

    /// Fail with [`MeshError::AttributeSchema`] if `name` is undeclared
    /// under strict attributes.
    pub fn check_name(&self, name: &str) -> Result<()> {
        if self.config.strict_attributes && !self.defaults.contains_key(name) {
            return Err(MeshError::AttributeSchema {
                kind: self.kind,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Validate a whole override map against the schema.
    pub fn check_names(&self, overrides: &AttrMap) -> Result<()> {
        overrides.keys().try_for_each(|name| self.check_name(name))
    }

    fn fresh_record(&self, overrides: AttrMap) -> Record {
        let values = match self.config.attribute_policy {
            AttributePolicy::CopyDefaults => {
                let mut values = (*self.defaults).clone();
                values.extend(overrides);
                values
            }
            AttributePolicy::Sparse => overrides,
        };
        Record {
            template: Arc::clone(&self.defaults),
            values,
        }
    }

    /// Create the record of a new entity. Callers validate names first.
    pub fn create(&mut self, key: K, overrides: AttrMap) {
        let record = self.fresh_record(overrides);
        self.records.insert(key, record);
    }

    /// Insert stored values verbatim (used when importing documents).
    pub fn restore(&mut self, key: K, values: AttrMap) {
        self.records.insert(
            key,
            Record {
                template: Arc::clone(&self.defaults),
                values,
            },
        );
    }

    /// Remove a record, returning its merged attributes.
    pub fn remove(&mut self, key: K) -> Option<AttrMap> {
        let record = self.records.remove(&key)?;
        Some(merged(&self.defaults, &record))
    }

    /// Duplicate a record, snapshot included. No-op when `from` has none.
    pub fn copy(&mut self, from: K, to: K) {
        if let Some(record) = self.records.get(&from).cloned() {
            self.records.insert(to, record);
        }
    }

    /// Move a record to a new key, keeping an existing record at `to`.
    pub fn rekey(&mut self, from: K, to: K) {
        if let Some(record) = self.records.remove(&from) {
            self.records.entry(to).or_insert(record);
        }
    }

    /// Whether a record exists.
    #[inline]
    pub fn contains(&self, key: K) -> bool {
        self.records.contains_key(&key)
    }

    /// Read one attribute: the override, then the creation snapshot, then the
    /// current template for names added after the record was created.
    pub fn get(&self, key: K, name: &str) -> Option<&Attr> {
        match self.records.get(&key) {
            Some(record) => record
                .values
                .get(name)
                .or_else(|| record.template.get(name))
                .or_else(|| self.defaults.get(name)),
            None => self.defaults.get(name),
        }
    }

    /// All attributes of an entity, template included.
    pub fn attributes(&self, key: K) -> AttrMap {
        match self.records.get(&key) {
            Some(record) => merged(&self.defaults, record),
            None => (*self.defaults).clone(),
        }
    }

    /// What the record stores (full map or overrides, per policy).
    pub fn stored(&self, key: K) -> Option<&AttrMap> {
        self.records.get(&key).map(|r| &r.values)
    }

    /// The values a document must carry to reproduce this record.
    ///
    /// Under the sparse policy these are the overrides plus every snapshot
    /// entry that no longer matches the current template, so a record
    /// restored under today's template reads the same values.
    pub fn exported(&self, key: K) -> Option<AttrMap> {
        let record = self.records.get(&key)?;
        let mut values = record.values.clone();
        if self.config.attribute_policy == AttributePolicy::Sparse && !Arc::ptr_eq(&record.template, &self.defaults) {
            for (name, value) in record.template.iter() {
                if !values.contains_key(name) && self.defaults.get(name) != Some(value) {
                    values.insert(name.clone(), value.clone());
                }
            }
        }
        Some(values)
    }

    /// Write one attribute, creating the record on first write.
    pub fn set(&mut self, key: K, name: &str, value: Attr) -> Result<()> {
        self.check_name(name)?;
        if !self.records.contains_key(&key) {
            let record = self.fresh_record(AttrMap::new());
            self.records.insert(key, record);
        }
        if let Some(record) = self.records.get_mut(&key) {
            record.values.insert(name.to_string(), value);
        }
        Ok(())
    }

    /// Drop an override so the template value shows through again.
    pub fn unset(&mut self, key: K, name: &str) {
        if let Some(record) = self.records.get_mut(&key) {
            match record.template.get(name) {
                Some(default) if self.config.attribute_policy == AttributePolicy::CopyDefaults => {
                    record.values.insert(name.to_string(), default.clone());
                }
                _ => {
                    record.values.remove(name);
                }
            }
        }
    }

    /// Keys that have a record.
    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.records.keys().copied()
    }

    /// Drop every record.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

fn merged(defaults: &AttrMap, record: &Record) -> AttrMap {
    let mut out = defaults.clone();
    out.extend(record.template.iter().map(|(k, v)| (k.clone(), v.clone())));
    out.extend(record.values.iter().map(|(k, v)| (k.clone(), v.clone())));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> AttrMap {
        attrs([("color", Attr::from("red")), ("weight", Attr::from(1.0))])
    }

    #[test]
    fn test_copy_defaults_stores_full_map() {
        let mut store = AttributeStore::<u64>::new("vertex", template(), MeshConfig::default());
        store.create(0, attrs([("weight", Attr::from(2.0))]));

        let stored = store.stored(0).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(store.get(0, "color"), Some(&Attr::from("red")));
        assert_eq!(store.get(0, "weight"), Some(&Attr::Float(2.0)));
    }

    #[test]
    fn test_sparse_stores_only_overrides() {
        let config = MeshConfig::default().sparse();
        let mut store = AttributeStore::<u64>::new("vertex", template(), config);
        store.create(0, attrs([("weight", Attr::from(2.0))]));

        assert_eq!(store.stored(0).unwrap().len(), 1);
        assert_eq!(store.get(0, "color"), Some(&Attr::from("red")));
        assert_eq!(store.attributes(0).len(), 2);
    }

    #[test]
    fn test_template_snapshot_is_captured_at_creation() {
        let config = MeshConfig::default().sparse();
        let mut store = AttributeStore::<u64>::new("vertex", template(), config);
        store.create(0, AttrMap::new());
        store.update_defaults(attrs([("color", Attr::from("blue"))]));
        store.create(1, AttrMap::new());

        assert_eq!(store.get(0, "color"), Some(&Attr::from("red")));
        assert_eq!(store.get(1, "color"), Some(&Attr::from("blue")));

        store.update_defaults(attrs([("size", Attr::from(4))]));
        assert_eq!(store.get(0, "size"), Some(&Attr::from(4)));
        assert_eq!(store.attributes(0).len(), 3);
    }

    #[test]
    fn test_exported_values_outlive_template_updates() {
        let config = MeshConfig::default().sparse();
        let mut store = AttributeStore::<u64>::new("vertex", template(), config);
        store.create(0, attrs([("weight", Attr::from(3.0))]));
        store.update_defaults(attrs([("color", Attr::from("blue"))]));
        store.create(1, AttrMap::new());

        let exported = store.exported(0).unwrap();
        assert_eq!(exported, attrs([("color", Attr::from("red")), ("weight", Attr::from(3.0))]));
        assert!(store.exported(1).unwrap().is_empty());

        let mut restored = AttributeStore::<u64>::new("vertex", store.defaults().clone(), config);
        restored.restore(0, exported);
        assert_eq!(restored.get(0, "color"), Some(&Attr::from("red")));
        assert_eq!(restored.exported(0), store.exported(0));
    }

    #[test]
    fn test_copy_keeps_snapshot() {
        let config = MeshConfig::default().sparse();
        let mut store = AttributeStore::<u64>::new("edge", template(), config);
        store.create(0, AttrMap::new());
        store.update_defaults(attrs([("weight", Attr::from(9.0))]));
        store.copy(0, 1);
        store.copy(5, 2);

        assert_eq!(store.get(1, "weight"), Some(&Attr::Float(1.0)));
        assert!(!store.contains(2));
    }

    #[test]
    fn test_strict_rejects_undeclared_names() {
        let config = MeshConfig::default().with_strict_attributes(true);
        let mut store = AttributeStore::<u64>::new("face", template(), config);
        store.create(0, AttrMap::new());

        assert!(store.set(0, "color", Attr::from("green")).is_ok());
        let err = store.set(0, "flavour", Attr::from("mint"));
        assert!(matches!(err, Err(MeshError::AttributeSchema { .. })));
        assert_eq!(store.get(0, "flavour"), None);
    }

    #[test]
    fn test_unset_restores_template_value() {
        let mut store = AttributeStore::<u64>::new("vertex", template(), MeshConfig::default());
        store.create(0, attrs([("color", Attr::from("green"))]));
        store.unset(0, "color");
        assert_eq!(store.get(0, "color"), Some(&Attr::from("red")));
    }

    #[test]
    fn test_attr_json_shapes() {
        let a = attrs([
            ("f", Attr::Float(1.0)),
            ("i", Attr::Int(3)),
            ("n", Attr::Null),
            ("l", Attr::from(vec![1.0, 2.0])),
        ]);
        let text = serde_json::to_string(&a).unwrap();
        let back: AttrMap = serde_json::from_str(&text).unwrap();
        assert_eq!(a, back);
    }
}
