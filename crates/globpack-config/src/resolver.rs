//! Expands config sources into an ordered, deduplicated list of descriptors.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use globset::GlobBuilder;
use path_clean::PathClean;
use serde_json::Value;
use walkdir::WalkDir;

use crate::descriptor::ConfigDescriptor;
use crate::error::{ConfigError, Result};
use crate::loader;
use crate::merge::apply_override;

/// Where configs come from.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// A file path or glob pattern, relative to the resolver's cwd unless
    /// absolute.
    Pattern(String),
    /// A config value supplied directly. `path` is a virtual location used as
    /// the descriptor key; its parent becomes the root dir.
    Inline { path: PathBuf, config: Value },
}

impl ConfigSource {
    pub fn inline(path: impl Into<PathBuf>, config: Value) -> Self {
        ConfigSource::Inline {
            path: path.into(),
            config,
        }
    }
}

impl From<&str> for ConfigSource {
    fn from(pattern: &str) -> Self {
        ConfigSource::Pattern(pattern.to_string())
    }
}

impl From<String> for ConfigSource {
    fn from(pattern: String) -> Self {
        ConfigSource::Pattern(pattern)
    }
}

impl From<&String> for ConfigSource {
    fn from(pattern: &String) -> Self {
        ConfigSource::Pattern(pattern.clone())
    }
}

impl From<PathBuf> for ConfigSource {
    fn from(path: PathBuf) -> Self {
        ConfigSource::Pattern(path.to_string_lossy().into_owned())
    }
}

impl From<&Path> for ConfigSource {
    fn from(path: &Path) -> Self {
        ConfigSource::Pattern(path.to_string_lossy().into_owned())
    }
}

/// Resolves config sources into descriptors.
///
/// # Example
///
/// ```no_run
/// use globpack_config::ConfigResolver;
/// use serde_json::json;
///
/// let descriptors = ConfigResolver::new(".")
///     .with_override(json!({ "mode": "production" }))
///     .resolve(["packages/*/globpack.json"])
///     .unwrap();
/// for descriptor in &descriptors {
///     println!("{}", descriptor.path.display());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    cwd: PathBuf,
    overrides: Option<Value>,
}

impl ConfigResolver {
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            overrides: None,
        }
    }

    /// Merge `overrides` into every resolved config.
    pub fn with_override(mut self, overrides: Value) -> Self {
        self.overrides = Some(overrides);
        self
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn overrides(&self) -> Option<&Value> {
        self.overrides.as_ref()
    }

    /// Resolve every source, in order, deduplicating by absolute path.
    ///
    /// # Errors
    ///
    /// Fails on the first source that cannot be expanded or the first file
    /// that cannot be loaded.
    pub fn resolve<I, S>(&self, sources: I) -> Result<Vec<ConfigDescriptor>>
    where
        I: IntoIterator<Item = S>,
        S: Into<ConfigSource>,
    {
        let mut seen = HashSet::new();
        let mut descriptors = Vec::new();

        for source in sources {
            match source.into() {
                ConfigSource::Pattern(pattern) => {
                    for path in self.expand(&pattern)? {
                        if !seen.insert(path.clone()) {
                            continue;
                        }
                        let loaded = loader::load_file(&path)?;
                        descriptors.push(self.describe(path, loaded));
                    }
                }
                ConfigSource::Inline { path, config } => {
                    let path = self.inline_key(&path);
                    if !seen.insert(path.clone()) {
                        continue;
                    }
                    loader::check_shape(&path, &config)?;
                    descriptors.push(self.describe(path, config));
                }
            }
        }

        tracing::debug!(count = descriptors.len(), "resolved configs");
        Ok(descriptors)
    }

    fn describe(&self, path: PathBuf, loaded: Value) -> ConfigDescriptor {
        let merged = apply_override(&loaded, self.overrides.as_ref());
        ConfigDescriptor::new(path, loaded, merged)
    }

    fn absolutize(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.clean()
        } else {
            self.cwd.join(path).clean()
        }
    }

    /// Key for a virtual inline path.
    ///
    /// The deepest existing ancestor is canonicalized so an inline source
    /// naming a discovered file dedups against it, symlinks included.
    fn inline_key(&self, path: &Path) -> PathBuf {
        let absolute = self.absolutize(path);
        for ancestor in absolute.ancestors() {
            if let Ok(resolved) = ancestor.canonicalize() {
                return match absolute.strip_prefix(ancestor) {
                    Ok(rest) if !rest.as_os_str().is_empty() => resolved.join(rest),
                    _ => resolved,
                };
            }
        }
        absolute
    }

    /// Expand a single pattern into canonical file paths, sorted by name
    /// within each directory.
    pub fn expand(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let absolute = self.absolutize(Path::new(pattern));

        if !is_glob(pattern) {
            if !absolute.is_file() {
                return Err(ConfigError::NotFound(absolute));
            }
            return Ok(vec![canonical(&absolute)?]);
        }

        let glob_str = absolute.to_string_lossy().into_owned();
        let matcher = GlobBuilder::new(&glob_str)
            .literal_separator(true)
            .build()
            .map_err(|e| ConfigError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?
            .compile_matcher();

        let (base, remaining) = split_base(&absolute);
        if !base.is_dir() {
            tracing::debug!(pattern, base = %base.display(), "glob base does not exist");
            return Ok(Vec::new());
        }

        let mut walker = WalkDir::new(&base).follow_links(true).sort_by_file_name();
        if !glob_str.contains("**") {
            walker = walker.max_depth(remaining);
        }

        let mut matches = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| ConfigError::Io {
                path: e.path().map(Path::to_path_buf).unwrap_or_else(|| base.clone()),
                source: e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("filesystem loop detected")),
            })?;
            if entry.file_type().is_file() && matcher.is_match(entry.path()) {
                matches.push(canonical(entry.path())?);
            }
        }

        tracing::debug!(pattern, matched = matches.len(), "expanded glob");
        Ok(matches)
    }
}

fn canonical(path: &Path) -> Result<PathBuf> {
    path.canonicalize().map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

/// Split an absolute glob into its literal base directory and the number of
/// path components below it.
fn split_base(pattern: &Path) -> (PathBuf, usize) {
    let mut base = PathBuf::new();
    let mut remaining = 0;
    let mut in_glob = false;

    for component in pattern.components() {
        if !in_glob {
            if let Component::Normal(part) = component {
                if is_glob(&part.to_string_lossy()) {
                    in_glob = true;
                }
            }
        }

        if in_glob {
            remaining += 1;
        } else {
            base.push(component);
        }
    }

    (base, remaining)
}
