//! Cache key derivation.
//!
//! A key is `<prefix>[:<scope>]:<hash>` where `hash` is the first 16 hex
//! characters of the MD5 of the canonical JSON form of the call arguments.
//! Canonical form sorts keyword arguments and every nested object's keys, so
//! the key depends only on the argument values, never on insertion order.

use super::category::CacheCategory;
use md5::{Digest, Md5};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

const HASH_LEN: usize = 16;

/// Positional and keyword arguments identifying one cached call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyArgs {
    scope: Option<String>,
    args: Vec<Value>,
    kwargs: BTreeMap<String, Value>,
}

impl KeyArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arguments for a single-resource entry; the id is also a visible key
    /// segment so `res:<id>:*` invalidates every variant of that resource.
    pub fn for_item(id: impl ToString + Into<Value>) -> Self {
        Self {
            scope: Some(id.to_string()),
            args: vec![id.into()],
            kwargs: BTreeMap::new(),
        }
    }

    /// Add a visible key segment between the prefix and the hash
    pub fn scoped(mut self, scope: impl ToString) -> Self {
        self.scope = Some(scope.to_string());
        self
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(name.into(), value.into());
        self
    }

    /// Add a keyword argument from any serializable value
    pub fn kwarg_json<T: serde::Serialize>(
        self,
        name: impl Into<String>,
        value: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(self.kwarg(name, serde_json::to_value(value)?))
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    fn canonical_json(&self) -> String {
        let kwargs: Vec<Value> = self
            .kwargs
            .iter()
            .map(|(name, value)| Value::Array(vec![Value::String(name.clone()), canonicalize(value)]))
            .collect();

        let mut root = Map::new();
        root.insert(
            "args".to_string(),
            Value::Array(self.args.iter().map(canonicalize).collect()),
        );
        root.insert("kwargs".to_string(), Value::Array(kwargs));

        Value::Object(root).to_string()
    }
}

/// Rebuild `value` with every object's keys in sorted order
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), canonicalize(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Derive the (un-namespaced) cache key for a call
pub fn derive_key(category: CacheCategory, args: &KeyArgs) -> String {
    let digest = Md5::digest(args.canonical_json().as_bytes());
    let hex = hex::encode(digest);
    let hash = &hex[..HASH_LEN];

    match &args.scope {
        Some(scope) => format!("{}:{}:{}", category.prefix(), scope, hash),
        None => format!("{}:{}", category.prefix(), hash),
    }
}
