//! Layered session options.
//!
//! Priority, lowest first: defaults, `globpack.options.json` in the working
//! directory, `GLOBPACK_*` environment variables, command-line flags.

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format as _, Json, Serialized},
};
use globpack::GlobpackOptions;
use serde_json::{Map, Value, json};

use crate::cli::RunArgs;
use crate::error::Result;

pub const OPTIONS_FILE: &str = "globpack.options.json";
pub const ENV_PREFIX: &str = "GLOBPACK_";

/// Load options for one invocation.
pub fn load_options(args: &RunArgs, cwd: &Path, colors: bool) -> Result<GlobpackOptions> {
    let options: GlobpackOptions = figment(args, cwd, colors).extract()?;
    tracing::debug!(?options, "options loaded");
    Ok(options)
}

fn figment(args: &RunArgs, cwd: &Path, colors: bool) -> Figment {
    let mut figment = Figment::new().merge(Serialized::defaults(GlobpackOptions::default()));

    let file = cwd.join(OPTIONS_FILE);
    if file.is_file() {
        figment = figment.merge(Json::file(file));
    }

    // GLOBPACK_FAIL_ON -> failOn
    figment = figment.merge(Env::prefixed(ENV_PREFIX).map(|key| camel_case(key.as_str()).into()));

    figment.merge(Serialized::defaults(flags(args, colors)))
}

/// Only flags that were actually given, so they do not mask lower layers.
fn flags(args: &RunArgs, colors: bool) -> Value {
    let mut layer = Map::new();
    let switches = [
        ("dryRun", args.dry_run),
        ("failures", args.failures),
        ("memoryFs", args.memory_fs),
        ("failOn", args.fail_on),
        ("silent", args.silent),
        ("progress", args.progress),
        ("json", args.json),
    ];
    for (key, set) in switches {
        if set {
            layer.insert(key.to_string(), Value::Bool(true));
        }
    }
    if let Some(ms) = args.aggregate_timeout {
        layer.insert("aggregateTimeout".to_string(), json!(ms));
    }
    if !colors {
        layer.insert("stats".to_string(), json!({ "colors": false }));
    }
    Value::Object(layer)
}

fn camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for ch in key.chars() {
        if ch == '_' {
            upper = true;
        } else if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.extend(ch.to_lowercase());
        }
    }
    out
}
