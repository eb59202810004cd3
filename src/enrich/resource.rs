use std::collections::HashMap;

/// Attribute view of a telemetry resource.
///
/// The surrounding pipeline owns the resource data model; the enricher
/// only needs to read identity attributes and upsert derived keys, so
/// hosts adapt their resource type by implementing this trait.
/// `set_attribute` has upsert semantics: writing an existing key
/// replaces its value, which keeps enrichment idempotent.
pub trait ResourceAttributes {
    fn attribute(&self, key: &str) -> Option<&str>;
    fn set_attribute(&mut self, key: &str, value: String);
}

impl ResourceAttributes for HashMap<String, String> {
    fn attribute(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }

    fn set_attribute(&mut self, key: &str, value: String) {
        self.insert(key.to_string(), value);
    }
}
