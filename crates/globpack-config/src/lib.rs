//! # globpack-config
//!
//! Config discovery for globpack: expands glob patterns into config files,
//! loads them (JSON or TOML), and merges a caller-supplied override into each.
//!
//! ```no_run
//! use globpack_config::{ConfigResolver, ConfigSource};
//! use serde_json::json;
//!
//! let descriptors = ConfigResolver::new("/repo")
//!     .with_override(json!({ "output": { "path": "/tmp/out" } }))
//!     .resolve([
//!         ConfigSource::from("packages/*/globpack.json"),
//!         ConfigSource::inline("/repo/inline.json", json!({ "entry": "./index.js" })),
//!     ])
//!     .unwrap();
//! assert!(!descriptors.is_empty());
//! ```

pub mod descriptor;
pub mod error;
pub mod loader;
pub mod merge;
pub mod resolver;
pub mod schema;

pub use descriptor::ConfigDescriptor;
pub use error::{ConfigError, Result};
pub use merge::{apply_override, merge_values};
pub use resolver::{ConfigResolver, ConfigSource};
pub use schema::{
    BundleConfig, Entry, Hints, Mode, OutputConfig, PerformanceConfig, WatchOptions,
};
