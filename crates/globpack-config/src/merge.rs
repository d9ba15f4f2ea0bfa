//! Override merging for loaded configs.

use serde_json::Value;

/// Merge `update` onto `target` in place.
///
/// Objects merge key by key, recursively. Any other override value (scalar,
/// array or null) replaces the base value outright, as does an object
/// override landing on a non-object base.
pub fn merge_values(target: &mut Value, update: &Value) {
    match (target, update) {
        (Value::Object(target_map), Value::Object(update_map)) => {
            for (key, value) in update_map {
                match target_map.get_mut(key) {
                    Some(slot) => merge_values(slot, value),
                    None => {
                        target_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target_slot, _) => {
            *target_slot = update.clone();
        }
    }
}

/// Apply `overrides` to a loaded config.
///
/// Array configs receive the override on every element.
pub fn apply_override(loaded: &Value, overrides: Option<&Value>) -> Value {
    let mut merged = loaded.clone();
    let Some(overrides) = overrides else {
        return merged;
    };

    match &mut merged {
        Value::Array(targets) => {
            for target in targets {
                merge_values(target, overrides);
            }
        }
        other => merge_values(other, overrides),
    }
    merged
}
