use std::path::{Path, PathBuf};

use serde_json::Value;

/// A resolved build configuration together with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDescriptor {
    /// Absolute path of the config file (or the virtual path of an inline
    /// config).
    pub path: PathBuf,
    /// Config exactly as loaded.
    pub loaded_config: Value,
    /// `loaded_config` with the resolver's override applied.
    pub merged_config: Value,
    /// Directory containing the config file.
    pub root_dir: PathBuf,
}

impl ConfigDescriptor {
    pub fn new(path: PathBuf, loaded_config: Value, merged_config: Value) -> Self {
        let root_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"));

        Self {
            path,
            loaded_config,
            merged_config,
            root_dir,
        }
    }

    /// Whether the config exports several targets.
    pub fn is_multi_target(&self) -> bool {
        self.merged_config.is_array()
    }

    /// Display name: the config's `name` field, else the file name.
    pub fn display_name(&self) -> String {
        if let Some(name) = self.merged_config.get("name").and_then(Value::as_str) {
            return name.to_string();
        }
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn root_dir_is_parent_directory() {
        let descriptor = ConfigDescriptor::new(
            PathBuf::from("/repo/packages/ui/globpack.json"),
            json!({}),
            json!({}),
        );
        assert_eq!(descriptor.root_dir, PathBuf::from("/repo/packages/ui"));
    }

    #[test]
    fn display_name_prefers_config_name() {
        let named = ConfigDescriptor::new(
            PathBuf::from("/repo/a.json"),
            json!({ "name": "client" }),
            json!({ "name": "client" }),
        );
        assert_eq!(named.display_name(), "client");

        let unnamed = ConfigDescriptor::new(PathBuf::from("/repo/a.json"), json!([]), json!([]));
        assert_eq!(unnamed.display_name(), "a.json");
    }
}
