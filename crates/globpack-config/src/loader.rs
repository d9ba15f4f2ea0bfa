//! Loading config files from disk.

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::error::{ConfigError, Result};

/// Load a config file into a JSON value and check its shape.
///
/// `.json` and `.toml` files are supported. The result is always an object or
/// a non-empty array of objects.
pub fn load_file(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ConfigError::NotFound(path.to_path_buf())
        } else {
            ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let value = parse(path, &content)?;
    check_shape(path, &value)?;
    Ok(value)
}

fn parse(path: &Path, content: &str) -> Result<Value> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("json") => serde_json::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: format!("Invalid JSON: {}", e),
        }),
        Some("toml") => {
            let toml_val: toml::Value = toml::from_str(content).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                reason: format!("Invalid TOML syntax: {}", e),
            })?;
            serde_json::to_value(toml_val).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                reason: format!("TOML to JSON conversion failed: {}", e),
            })
        }
        _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Reject anything that is not an object or a non-empty array of objects.
pub fn check_shape(path: &Path, value: &Value) -> Result<()> {
    let invalid = |found: &str| ConfigError::InvalidShape {
        path: path.to_path_buf(),
        found: found.to_string(),
    };

    match value {
        Value::Object(_) => Ok(()),
        Value::Array(items) if items.is_empty() => Err(invalid("an empty array")),
        Value::Array(items) => match items.iter().find(|item| !item.is_object()) {
            Some(item) => Err(invalid(&format!("an array containing {}", kind(item)))),
            None => Ok(()),
        },
        other => Err(invalid(kind(other))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
