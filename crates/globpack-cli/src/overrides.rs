//! The override merged into every config, from `--override` and `--set`.

use std::path::Path;

use globpack_config::{loader, merge_values};
use serde_json::{Map, Value};

use crate::error::{CliError, Result};

/// Build the override value, or `None` when neither flag was given.
///
/// `--set` entries apply on top of the `--override` file, in order.
pub fn build_override(cwd: &Path, file: Option<&Path>, sets: &[String]) -> Result<Option<Value>> {
    let mut overrides = match file {
        Some(file) => {
            let path = cwd.join(file);
            let value = loader::load_file(&path)?;
            if !value.is_object() {
                return Err(CliError::InvalidArgument(format!(
                    "override file {} must contain an object",
                    path.display()
                )));
            }
            Some(value)
        }
        None => None,
    };

    for assignment in sets {
        let update = parse_assignment(assignment)?;
        overrides = Some(match overrides.take() {
            Some(mut existing) => {
                merge_values(&mut existing, &update);
                existing
            }
            None => update,
        });
    }

    Ok(overrides)
}

/// `output.path=build` -> `{ "output": { "path": "build" } }`.
fn parse_assignment(assignment: &str) -> Result<Value> {
    let invalid = || {
        CliError::InvalidArgument(format!(
            "--set expects KEY=VALUE with a dotted key, got '{}'",
            assignment
        ))
    };

    let (key, raw) = assignment.split_once('=').ok_or_else(invalid)?;
    if key.is_empty() || key.split('.').any(str::is_empty) {
        return Err(invalid());
    }

    let mut value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    for segment in key.rsplit('.') {
        let mut object = Map::new();
        object.insert(segment.to_string(), value);
        value = Value::Object(object);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn no_flags_means_no_override() {
        assert_eq!(build_override(Path::new("/"), None, &[]).unwrap(), None);
    }

    #[test]
    fn set_builds_nested_values() {
        let value = build_override(
            Path::new("/"),
            None,
            &[
                "output.path=build".to_string(),
                "performance.maxAssetSize=1024".to_string(),
                "mode=\"production\"".to_string(),
            ],
        )
        .unwrap()
        .unwrap();

        assert_eq!(
            value,
            json!({
                "output": { "path": "build" },
                "performance": { "maxAssetSize": 1024 },
                "mode": "production"
            })
        );
    }

    #[test]
    fn set_applies_over_the_file() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("override.json"),
            r#"{ "output": { "path": "from-file", "filename": "[name].js" } }"#,
        )
        .unwrap();

        let value = build_override(
            temp.path(),
            Some(Path::new("override.json")),
            &["output.path=from-flag".to_string()],
        )
        .unwrap()
        .unwrap();

        assert_eq!(
            value,
            json!({ "output": { "path": "from-flag", "filename": "[name].js" } })
        );
    }

    #[test]
    fn array_override_file_is_rejected() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("override.json"), r#"[{ "mode": "none" }]"#).unwrap();

        let err = build_override(temp.path(), Some(Path::new("override.json")), &[]).unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument(_)));
    }

    #[test]
    fn malformed_assignments_are_rejected() {
        for bad in ["novalue", "=x", "a..b=1"] {
            assert!(parse_assignment(bad).is_err(), "{}", bad);
        }
    }
}
