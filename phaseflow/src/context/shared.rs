//! The shared pipeline context.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Key-value data produced by phases and threaded through a run.
pub type ContextData = HashMap<String, serde_json::Value>;

/// The single mapping shared by every phase of one pipeline run.
///
/// The orchestrator owns the context and is its only writer. Phases only
/// ever see a shared borrow, and hand their output back as [`ContextData`]
/// for the orchestrator to merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PipelineContext {
    data: ContextData,
}

impl PipelineContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context seeded with data.
    #[must_use]
    pub fn from_data(data: ContextData) -> Self {
        Self { data }
    }

    /// Gets a value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Gets a value deserialized into `T`.
    ///
    /// Returns `None` when the key is absent or has a different shape.
    #[must_use]
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Checks if a key exists.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Returns the keys from `required` that are absent, in order.
    #[must_use]
    pub fn missing_keys<'a>(&self, required: &'a [String]) -> Vec<&'a str> {
        required
            .iter()
            .filter(|key| !self.data.contains_key(key.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Inserts a single value, replacing any previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.data.insert(key.into(), value);
    }

    /// Merges phase output. Later writes win.
    pub fn merge(&mut self, data: ContextData) {
        self.data.extend(data);
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the context is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the keys in sorted order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.data.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Borrows the underlying map.
    #[must_use]
    pub fn as_data(&self) -> &ContextData {
        &self.data
    }

    /// Consumes the context and returns its data.
    #[must_use]
    pub fn into_data(self) -> ContextData {
        self.data
    }
}

impl From<ContextData> for PipelineContext {
    fn from(data: ContextData) -> Self {
        Self::from_data(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_overwrites() {
        let mut ctx = PipelineContext::new();
        ctx.insert("org", json!("acme"));

        let mut update = ContextData::new();
        update.insert("org".to_string(), json!("acme-research"));
        update.insert("repos".to_string(), json!(12));
        ctx.merge(update);

        assert_eq!(ctx.get("org"), Some(&json!("acme-research")));
        assert_eq!(ctx.get_as::<u32>("repos"), Some(12));
        assert_eq!(ctx.len(), 2);
    }

    #[test]
    fn test_missing_keys_preserves_order() {
        let mut ctx = PipelineContext::new();
        ctx.insert("b", json!(true));

        let required = vec!["c".to_string(), "b".to_string(), "a".to_string()];
        assert_eq!(ctx.missing_keys(&required), vec!["c", "a"]);
    }

    #[test]
    fn test_get_as_wrong_shape() {
        let mut ctx = PipelineContext::new();
        ctx.insert("count", json!("not a number"));

        assert_eq!(ctx.get_as::<u64>("count"), None);
        assert_eq!(ctx.get_as::<u64>("absent"), None);
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let mut ctx = PipelineContext::new();
        ctx.insert("x", json!(1));

        assert_eq!(serde_json::to_value(&ctx).unwrap(), json!({"x": 1}));
        assert_eq!(ctx.keys(), vec!["x".to_string()]);

        ctx.clear();
        assert!(ctx.is_empty());
    }
}
