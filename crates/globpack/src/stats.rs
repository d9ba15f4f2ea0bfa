//! Compile reports and the fixed policy for how much of them to show.

use std::path::PathBuf;

use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// How much detail stats output carries.
///
/// One immutable value is handed to every compile and every serialization;
/// the defaults are the verbosity globpack always uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatsOptions {
    pub colors: bool,
    pub hash: bool,
    pub timings: bool,
    pub chunks: bool,
    pub chunk_modules: bool,
    pub modules: bool,
    pub children: bool,
    pub version: bool,
    pub cached: bool,
    pub cached_assets: bool,
    pub reasons: bool,
    pub source: bool,
    pub error_details: bool,
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self {
            colors: true,
            hash: true,
            timings: true,
            chunks: false,
            chunk_modules: false,
            modules: false,
            children: true,
            version: false,
            cached: false,
            cached_assets: false,
            reasons: false,
            source: false,
            error_details: false,
        }
    }
}

impl StatsOptions {
    /// Same policy without ANSI colors, for files and non-terminal sinks.
    pub fn without_colors(mut self) -> Self {
        self.colors = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetStats {
    pub name: String,
    pub size: u64,
    /// Chunk the asset was emitted for.
    pub chunk: String,
}

/// Structured report of one compile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Config file that produced this compile.
    pub config: PathBuf,
    pub name: Option<String>,
    pub hash: String,
    /// Compile duration in milliseconds.
    pub time: u64,
    /// Completion time, milliseconds since the Unix epoch.
    pub built_at: u64,
    pub output_path: PathBuf,
    pub assets: Vec<AssetStats>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// One entry per target when the config exports several.
    pub children: Vec<Stats>,
}

impl Stats {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty() || self.children.iter().any(Stats::has_errors)
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty() || self.children.iter().any(Stats::has_warnings)
    }

    /// Errors of this compile and all children.
    pub fn all_errors(&self) -> Vec<&str> {
        let mut errors: Vec<&str> = self.errors.iter().map(String::as_str).collect();
        for child in &self.children {
            errors.extend(child.all_errors());
        }
        errors
    }

    /// Warnings of this compile and all children.
    pub fn all_warnings(&self) -> Vec<&str> {
        let mut warnings: Vec<&str> = self.warnings.iter().map(String::as_str).collect();
        for child in &self.children {
            warnings.extend(child.all_warnings());
        }
        warnings
    }

    /// Serialize according to `options`.
    pub fn to_json(&self, options: &StatsOptions) -> Value {
        let message = |text: &String| -> Value {
            if options.error_details {
                Value::String(text.clone())
            } else {
                Value::String(text.lines().next().unwrap_or_default().to_string())
            }
        };

        let mut map = serde_json::Map::new();
        map.insert("config".into(), json!(self.config));
        if let Some(name) = &self.name {
            map.insert("name".into(), json!(name));
        }
        if options.hash {
            map.insert("hash".into(), json!(self.hash));
        }
        if options.timings {
            map.insert("time".into(), json!(self.time));
            map.insert("builtAt".into(), json!(self.built_at));
        }
        if options.version {
            map.insert("version".into(), json!(env!("CARGO_PKG_VERSION")));
        }
        map.insert("outputPath".into(), json!(self.output_path));
        map.insert("assets".into(), json!(self.assets));
        map.insert(
            "errors".into(),
            Value::Array(self.errors.iter().map(message).collect()),
        );
        map.insert(
            "warnings".into(),
            Value::Array(self.warnings.iter().map(message).collect()),
        );
        if options.children && !self.children.is_empty() {
            let children: Vec<Value> = self.children.iter().map(|c| c.to_json(options)).collect();
            map.insert("children".into(), Value::Array(children));
        }
        Value::Object(map)
    }

    /// One-line human summary.
    pub fn summary(&self, options: &StatsOptions) -> String {
        let label = self
            .name
            .clone()
            .or_else(|| {
                self.config
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| self.config.display().to_string());

        let errors = self.all_errors().len();
        let warnings = self.all_warnings().len();
        let assets = self.assets.len()
            + self.children.iter().map(|c| c.assets.len()).sum::<usize>();

        let mut details = String::new();
        if options.hash && !self.hash.is_empty() {
            details.push_str(&format!(" [{}]", self.hash));
        }
        if options.timings {
            details.push_str(&format!(" built in {}ms", self.time));
        }
        let counts = format!(
            ": {} asset(s), {} error(s), {} warning(s)",
            assets, errors, warnings
        );

        if !options.colors {
            return format!("{}{}{}", label, details, counts);
        }

        let marker = if errors > 0 {
            "✗".red().bold().to_string()
        } else if warnings > 0 {
            "⚠".yellow().bold().to_string()
        } else {
            "✓".green().bold().to_string()
        };
        format!("{} {}{}{}", marker, label.bold(), details, counts.dimmed())
    }
}

/// Short content hash used for compile hashes and `[hash]` substitution.
pub fn content_hash<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> String {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    let hex = hasher.finalize().to_hex();
    hex[..20].to_string()
}

/// Milliseconds since the Unix epoch.
pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
