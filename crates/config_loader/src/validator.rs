//! Per-entry validation
//!
//! Rules:
//! - key is a decimal serial number
//! - `frame_id` / `topic_name`, when present, are strings
//! - `translation` is an array of exactly 3 numbers
//! - `rotation` is an array of 3 (roll, pitch, yaw) or 4 (x, y, z, w) numbers
//!
//! A failing entry is rejected on its own; the caller keeps loading the rest.

use contracts::{ContractError, Quaternion, Rotation, SerialNumber, TransformEntry};
use serde_json::Value;

/// Validate one `"<serial>": { ... }` entry
pub fn validate_entry(
    key: &str,
    value: &Value,
    frame_prefix: &str,
) -> Result<TransformEntry, ContractError> {
    let serial_number = parse_serial(key)?;
    let field = |name: &str| format!("[{serial_number}].{name}");

    let object = value.as_object().ok_or_else(|| {
        ContractError::config_validation(format!("[{serial_number}]"), "entry is not an object")
    })?;

    let frame_id = match object.get("frame_id") {
        None => format!("{frame_prefix}_{serial_number}"),
        Some(Value::String(s)) => s.clone(),
        Some(_) => {
            return Err(ContractError::config_validation(
                field("frame_id"),
                "frame_id must be a string",
            ))
        }
    };

    let topic_name = match object.get("topic_name") {
        None => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            return Err(ContractError::config_validation(
                field("topic_name"),
                "topic_name must be a string",
            ))
        }
    };

    let translation = number_array(object.get("translation"), &field("translation"))?;
    let rotation = number_array(object.get("rotation"), &field("rotation"))?;

    if translation.len() != 3 {
        return Err(ContractError::config_validation(
            field("translation"),
            format!(
                "incorrect number of elements in translation array: expected 3, got {}",
                translation.len()
            ),
        ));
    }

    let rotation = match rotation.as_slice() {
        &[roll, pitch, yaw] => Rotation::Rpy { roll, pitch, yaw },
        &[x, y, z, w] => Rotation::Quaternion(Quaternion { x, y, z, w }),
        other => {
            return Err(ContractError::config_validation(
                field("rotation"),
                format!(
                    "incorrect number of rotation array elements: got {}, use 3 for RPY, 4 for quaternion",
                    other.len()
                ),
            ))
        }
    };

    Ok(TransformEntry {
        serial_number,
        frame_id,
        translation: [translation[0], translation[1], translation[2]],
        rotation,
        topic_name,
    })
}

fn parse_serial(key: &str) -> Result<SerialNumber, ContractError> {
    key.trim().parse::<SerialNumber>().map_err(|e| {
        ContractError::config_validation(
            format!("[{key}]"),
            format!("key is not a decimal serial number: {e}"),
        )
    })
}

/// Array of numbers, rejecting non-arrays and non-numeric elements
fn number_array(value: Option<&Value>, field: &str) -> Result<Vec<f64>, ContractError> {
    let array = match value {
        Some(Value::Array(a)) => a,
        Some(_) => {
            return Err(ContractError::config_validation(
                field,
                "malformed array: value is not an array",
            ))
        }
        None => {
            return Err(ContractError::config_validation(
                field,
                "missing required array",
            ))
        }
    };

    array
        .iter()
        .enumerate()
        .map(|(idx, v)| {
            v.as_f64().ok_or_else(|| {
                ContractError::config_validation(
                    format!("{field}[{idx}]"),
                    format!("expected a number, got {v}"),
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_for_missing_names() {
        let entry = validate_entry(
            "12",
            &json!({ "translation": [1, 2, 3], "rotation": [0, 0, 0] }),
            "cepton",
        )
        .unwrap();
        assert_eq!(entry.serial_number, 12);
        assert_eq!(entry.frame_id, "cepton_12");
        assert_eq!(entry.topic_name, None);
        assert_eq!(entry.translation, [1.0, 2.0, 3.0]);
        assert_eq!(
            entry.rotation,
            Rotation::Rpy {
                roll: 0.0,
                pitch: 0.0,
                yaw: 0.0
            }
        );
    }

    #[test]
    fn test_quaternion_passthrough() {
        let entry = validate_entry(
            "3",
            &json!({
                "frame_id": "roof",
                "topic_name": "roof",
                "translation": [0, 0, 2],
                "rotation": [0.1, 0.2, 0.3, 2.0]
            }),
            "cepton",
        )
        .unwrap();
        assert_eq!(entry.frame_id, "roof");
        assert_eq!(entry.topic_name.as_deref(), Some("roof"));
        assert_eq!(
            entry.rotation,
            Rotation::Quaternion(Quaternion {
                x: 0.1,
                y: 0.2,
                z: 0.3,
                w: 2.0
            })
        );
    }

    #[test]
    fn test_translation_length_rejected() {
        let err = validate_entry(
            "5",
            &json!({ "translation": [1, 2], "rotation": [0, 0, 0] }),
            "cepton",
        )
        .unwrap_err();
        assert!(err.to_string().contains("translation"));
    }

    #[test]
    fn test_rotation_length_rejected() {
        let err = validate_entry(
            "5",
            &json!({ "translation": [1, 2, 3], "rotation": [0, 0] }),
            "cepton",
        )
        .unwrap_err();
        assert!(err.to_string().contains("rotation"));
    }

    #[test]
    fn test_non_array_rejected() {
        assert!(validate_entry(
            "5",
            &json!({ "translation": "1,2,3", "rotation": [0, 0, 0] }),
            "cepton",
        )
        .is_err());
        assert!(validate_entry(
            "5",
            &json!({ "translation": [1, 2, 3], "rotation": { "yaw": 1 } }),
            "cepton",
        )
        .is_err());
        assert!(validate_entry("5", &json!({ "rotation": [0, 0, 0] }), "cepton").is_err());
    }

    #[test]
    fn test_non_numeric_serial_rejected() {
        let err = validate_entry(
            "front",
            &json!({ "translation": [1, 2, 3], "rotation": [0, 0, 0] }),
            "cepton",
        )
        .unwrap_err();
        assert!(matches!(err, ContractError::ConfigValidation { .. }));
    }
}
