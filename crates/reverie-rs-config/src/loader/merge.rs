//! JSON merge helpers for layered configuration.

use serde_json::Value;

/// Merge overlay values into the base, recursively overriding objects.
///
/// Arrays and scalars in the overlay replace the base value wholesale.
pub(super) fn merge_json_values(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(existing) => merge_json_values(existing, value),
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base_slot, overlay_value) => {
            *base_slot = overlay_value.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::merge_json_values;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn nested_objects_merge_key_by_key() {
        let mut base = json!({ "memory": { "dimensions": 384, "weights": { "recency": 1.0 } } });
        let overlay = json!({ "memory": { "weights": { "importance": 2.0 } } });
        merge_json_values(&mut base, &overlay);
        assert_eq!(
            base,
            json!({
                "memory": {
                    "dimensions": 384,
                    "weights": { "recency": 1.0, "importance": 2.0 }
                }
            })
        );
    }

    #[test]
    fn null_overlay_clears_value() {
        let mut base = json!({ "memory": { "reflection_threshold": 20.0 } });
        merge_json_values(&mut base, &json!({ "memory": { "reflection_threshold": null } }));
        assert_eq!(base, json!({ "memory": { "reflection_threshold": null } }));
    }
}
