//! Typed view of a bundle config.
//!
//! Descriptors keep the merged config as a plain JSON value; the bundler
//! parses it into these types when it builds a compiler.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{ConfigError, Result};

/// Default chunk name for string and array entries.
pub const DEFAULT_CHUNK: &str = "main";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BundleConfig {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub mode: Option<Mode>,

    /// Base directory for entries and the output path.
    #[serde(default)]
    pub context: Option<PathBuf>,

    pub entry: Entry,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub performance: PerformanceConfig,

    #[serde(default)]
    pub watch_options: WatchOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Development,
    Production,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Entry {
    Single(String),
    Multiple(Vec<String>),
    Named(IndexMap<String, String>),
}

impl Entry {
    /// Chunk name paired with the entry files it concatenates, in order.
    pub fn chunks(&self) -> Vec<(String, Vec<PathBuf>)> {
        match self {
            Entry::Single(file) => vec![(DEFAULT_CHUNK.to_string(), vec![PathBuf::from(file)])],
            Entry::Multiple(files) => vec![(
                DEFAULT_CHUNK.to_string(),
                files.iter().map(PathBuf::from).collect(),
            )],
            Entry::Named(map) => map
                .iter()
                .map(|(name, file)| (name.clone(), vec![PathBuf::from(file)]))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: PathBuf,

    #[serde(default = "default_filename")]
    pub filename: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            filename: default_filename(),
        }
    }
}

fn default_output_path() -> PathBuf {
    PathBuf::from("dist")
}

fn default_filename() -> String {
    "[name].js".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Hints {
    Warning,
    Error,
    Off,
}

impl<'de> Deserialize<'de> for Hints {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Flag(bool),
            Level(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Flag(false) => Ok(Hints::Off),
            Repr::Flag(true) => Ok(Hints::Warning),
            Repr::Level(level) => match level.as_str() {
                "warning" => Ok(Hints::Warning),
                "error" => Ok(Hints::Error),
                other => Err(serde::de::Error::custom(format!(
                    "unknown performance hint level '{}', expected \"warning\", \"error\" or false",
                    other
                ))),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceConfig {
    /// Unset hints follow the mode: warnings in production, off otherwise.
    #[serde(default)]
    pub hints: Option<Hints>,

    #[serde(default)]
    pub max_asset_size: Option<u64>,
}

impl PerformanceConfig {
    pub const DEFAULT_MAX_ASSET_SIZE: u64 = 250_000;

    pub fn effective_hints(&self, mode: Option<Mode>) -> Hints {
        match (self.hints, mode) {
            (Some(hints), _) => hints,
            (None, Some(Mode::Production)) => Hints::Warning,
            (None, _) => Hints::Off,
        }
    }

    pub fn max_asset_size(&self) -> u64 {
        self.max_asset_size.unwrap_or(Self::DEFAULT_MAX_ASSET_SIZE)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchOptions {
    /// Coalescing window in milliseconds.
    #[serde(default)]
    pub aggregate_timeout: Option<u64>,

    /// Glob patterns (relative to the config's root dir) that never trigger
    /// a rebuild.
    #[serde(default, deserialize_with = "one_or_many")]
    pub ignored: Vec<String>,
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Repr::deserialize(deserializer)? {
        Repr::One(pattern) => vec![pattern],
        Repr::Many(patterns) => patterns,
    })
}

impl BundleConfig {
    /// Parse one target object.
    pub fn from_value(path: &Path, value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone()).map_err(|e| ConfigError::Schema {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Parse a merged config, which is either a single target or an array of
    /// targets.
    pub fn targets(path: &Path, merged: &Value) -> Result<Vec<Self>> {
        match merged {
            Value::Array(items) => items
                .iter()
                .map(|item| Self::from_value(path, item))
                .collect(),
            other => Ok(vec![Self::from_value(path, other)?]),
        }
    }

    /// Directory entries and the output path are resolved against.
    pub fn context_dir(&self, root_dir: &Path) -> PathBuf {
        match &self.context {
            Some(context) if context.is_absolute() => context.clone(),
            Some(context) => root_dir.join(context),
            None => root_dir.to_path_buf(),
        }
    }

    /// Absolute output directory.
    pub fn output_dir(&self, root_dir: &Path) -> PathBuf {
        use path_clean::PathClean;

        if self.output.path.is_absolute() {
            self.output.path.clean()
        } else {
            self.context_dir(root_dir).join(&self.output.path).clean()
        }
    }
}
