//! Transform file parsing
//!
//! JSON is the native format; TOML with the same shape is accepted too.
//! Both are parsed into a generic object so each entry can be validated
//! (and rejected) on its own.

use contracts::ContractError;
use serde_json::{Map, Value};

/// Transform file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON (default)
    Json,
    /// TOML
    Toml,
}

impl ConfigFormat {
    /// Infer format from file extension, defaulting to JSON
    pub fn from_extension(ext: Option<&str>) -> Self {
        match ext.map(str::to_lowercase).as_deref() {
            Some("toml") => Self::Toml,
            _ => Self::Json,
        }
    }
}

/// Top-level object: serial number string -> entry object
pub type RawEntries = Map<String, Value>;

/// Parse JSON transform file content
pub fn parse_json(content: &str) -> Result<RawEntries, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse TOML transform file content
pub fn parse_toml(content: &str) -> Result<RawEntries, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse content according to format
pub fn parse(content: &str, format: ConfigFormat) -> Result<RawEntries, ContractError> {
    match format {
        ConfigFormat::Json => parse_json(content),
        ConfigFormat::Toml => parse_toml(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_object() {
        let content = r#"{
            "5": { "translation": [0, 0, 1], "rotation": [0, 0, 0] },
            "9": { "frame_id": "rear", "translation": [1, 2, 3], "rotation": [0, 0, 0, 1] }
        }"#;
        let entries = parse_json(content).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries["9"]["frame_id"].is_string());
    }

    #[test]
    fn test_parse_json_not_an_object() {
        let err = parse_json("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_parse_toml_same_shape() {
        let content = r#"
[5]
frame_id = "front"
translation = [0.0, 0.0, 1.5]
rotation = [0.0, 0.0, 0.0]
"#;
        let entries = parse_toml(content).unwrap();
        assert_eq!(entries["5"]["frame_id"], "front");
        assert_eq!(entries["5"]["translation"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let err = parse_toml("invalid toml [[[").unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_extension(Some("toml")), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_extension(Some("TOML")), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_extension(Some("json")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_extension(None), ConfigFormat::Json);
    }
}
