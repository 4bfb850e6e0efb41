//! Deployment property merging.

use serde_json::{Map, Value};

/// Fold deployment properties, lowest to highest precedence: application
/// defaults, then service-level values, then caller overrides.
///
/// Merging is per key; a later layer replaces an earlier value wholesale,
/// it does not merge into it.
pub fn merge_properties(
    defaults: &Map<String, Value>,
    service: &Map<String, Value>,
    overrides: &Map<String, Value>,
) -> Map<String, Value> {
    let mut merged = Map::new();
    for (key, value) in defaults.iter().chain(service.iter()).chain(overrides.iter()) {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn layer(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn test_later_layers_win() {
        let defaults = layer(&[("heap", json!("512m")), ("mode", json!("shared"))]);
        let service = layer(&[("mode", json!("dedicated"))]);
        let overrides = layer(&[("heap", json!("1g"))]);

        let merged = merge_properties(&defaults, &service, &overrides);
        assert_eq!(merged["heap"], json!("1g"));
        assert_eq!(merged["mode"], json!("dedicated"));
    }

    #[test]
    fn test_disjoint_keys_all_survive() {
        let defaults = layer(&[("a", json!(1))]);
        let service = layer(&[("b", json!(2))]);
        let overrides = layer(&[("c", json!(3))]);

        let merged = merge_properties(&defaults, &service, &overrides);
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_replacement_is_wholesale() {
        let defaults = layer(&[("db", json!({"host": "localhost", "port": 5432}))]);
        let overrides = layer(&[("db", json!({"host": "db.internal"}))]);

        let merged = merge_properties(&defaults, &Map::new(), &overrides);
        assert_eq!(merged["db"], json!({"host": "db.internal"}));
    }
}
