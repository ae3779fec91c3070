//! Configuration loading with layered precedence.
//!
//! Layers are composed manually with `MergeComposer` (lowest to highest):
//! application defaults, configuration file, environment variables. The
//! environment is read through [`mockable::Env`] so tests can supply
//! variables without touching the process environment.
//!
//! Typed environment variables fail fast: `TESTPOD_PULL_SKIP=maybe` is an
//! error rather than a silent fallback to the default. String fields such as
//! `TESTPOD_ENGINE_SOCKET` are always accepted.

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use ortho_config::discovery::ConfigDiscovery;
use ortho_config::serde_json::{self, Map, Value};
use ortho_config::{MergeComposer, toml};

use crate::config::TestpodConfig;
use crate::error::{ConfigError, Result};

/// Environment variable naming an explicit configuration file.
const CONFIG_PATH_ENV_VAR: &str = "TESTPOD_CONFIG_PATH";

/// The type of value expected from an environment variable.
#[derive(Clone, Copy)]
enum EnvVarType {
    /// String value (always accepted).
    String,
    /// Boolean value (`true`/`false`).
    Bool,
    /// Unsigned 64-bit integer.
    U64,
}

/// Mapping from one environment variable to a configuration field.
struct EnvVarSpec {
    env_var: &'static str,
    path: &'static [&'static str],
    var_type: EnvVarType,
}

const ENV_VAR_SPECS: &[EnvVarSpec] = &[
    EnvVarSpec {
        env_var: "TESTPOD_ENGINE_SOCKET",
        path: &["engine_socket"],
        var_type: EnvVarType::String,
    },
    EnvVarSpec {
        env_var: "TESTPOD_PROBE_HOST",
        path: &["probe_host"],
        var_type: EnvVarType::String,
    },
    EnvVarSpec {
        env_var: "TESTPOD_READINESS_STARTUP_TIMEOUT_SECS",
        path: &["readiness", "startup_timeout_secs"],
        var_type: EnvVarType::U64,
    },
    EnvVarSpec {
        env_var: "TESTPOD_READINESS_POLL_INTERVAL_MS",
        path: &["readiness", "poll_interval_ms"],
        var_type: EnvVarType::U64,
    },
    EnvVarSpec {
        env_var: "TESTPOD_PULL_SKIP",
        path: &["pull", "skip"],
        var_type: EnvVarType::Bool,
    },
];

/// Returns the environment variable names recognised by the loader.
///
/// Tests that touch the process environment use this list to clear every
/// `TESTPOD_*` variable the loader reads.
#[must_use]
pub fn env_var_names() -> Vec<&'static str> {
    ENV_VAR_SPECS
        .iter()
        .map(|spec| spec.env_var)
        .chain(std::iter::once(CONFIG_PATH_ENV_VAR))
        .collect()
}

/// Load harness configuration with full layer precedence.
///
/// The configuration file is `explicit_path` when given, otherwise the path
/// in `TESTPOD_CONFIG_PATH`, otherwise the first discovered `.testpod.toml`
/// or `testpod/config.toml`. An explicitly named file must exist; discovered
/// candidates that do not exist are skipped.
///
/// # Errors
///
/// Returns `ConfigError` when:
/// - the configuration file cannot be read or parsed
/// - a typed environment variable has an unparseable value
/// - the merged configuration is invalid (for example a zero poll interval)
pub fn load_config(
    env: &impl mockable::Env,
    explicit_path: Option<&Utf8Path>,
) -> Result<TestpodConfig> {
    let mut composer = MergeComposer::new();

    let defaults =
        serde_json::to_value(TestpodConfig::default()).map_err(|e| ConfigError::ParseError {
            message: format!("failed to serialise defaults: {e}"),
        })?;
    composer.push_defaults(defaults);

    if let Some(path) = config_file_path(env, explicit_path) {
        tracing::debug!(%path, "loading configuration file");
        load_config_file(&path, &mut composer)?;
    }

    let env_values = collect_env_vars(env)?;
    if !env_values.is_null() {
        composer.push_environment(env_values);
    }

    let config =
        TestpodConfig::merge_from_layers(composer.layers()).map_err(ConfigError::OrthoConfig)?;
    validate(&config)?;

    Ok(config)
}

/// Pick the configuration file to load, if any.
fn config_file_path(
    env: &impl mockable::Env,
    explicit_path: Option<&Utf8Path>,
) -> Option<Utf8PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if let Some(path) = env.string(CONFIG_PATH_ENV_VAR).filter(|value| !value.is_empty()) {
        return Some(Utf8PathBuf::from(path));
    }

    ConfigDiscovery::builder("testpod")
        .config_file_name("config.toml")
        .dotfile_name(".testpod.toml")
        .build()
        .candidates()
        .into_iter()
        .filter(|candidate| candidate.exists())
        .find_map(|candidate| Utf8PathBuf::try_from(candidate).ok())
}

/// Read a TOML file through `cap_std` and push it as the file layer.
fn load_config_file(path: &Utf8Path, composer: &mut MergeComposer) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let file_name = path.file_name().unwrap_or(path.as_str());

    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(|e| {
        ConfigError::ParseError {
            message: format!("failed to open directory {parent}: {e}"),
        }
    })?;

    let content = dir
        .read_to_string(file_name)
        .map_err(|e| ConfigError::ParseError {
            message: format!("failed to read {path}: {e}"),
        })?;

    let value =
        toml::from_str::<serde_json::Value>(&content).map_err(|e| ConfigError::ParseError {
            message: format!("failed to parse {path}: {e}"),
        })?;

    composer.push_file(value, Some(path.to_path_buf()));
    Ok(())
}

/// Collect the `TESTPOD_*` variables into a JSON value shaped like the
/// configuration, or `Null` when none are set.
fn collect_env_vars(env: &impl mockable::Env) -> Result<Value> {
    let mut root = Map::new();

    for spec in ENV_VAR_SPECS {
        let Some(raw_value) = env.string(spec.env_var) else {
            continue;
        };

        let json_value = match spec.var_type {
            EnvVarType::String => Value::String(raw_value),
            EnvVarType::Bool => raw_value
                .parse::<bool>()
                .map(Value::Bool)
                .map_err(|_| ConfigError::InvalidValue {
                    field: spec.env_var.to_owned(),
                    reason: format!("expected bool (true/false), got '{raw_value}'"),
                })?,
            EnvVarType::U64 => raw_value
                .parse::<u64>()
                .map(|number| Value::Number(number.into()))
                .map_err(|_| ConfigError::InvalidValue {
                    field: spec.env_var.to_owned(),
                    reason: format!("expected unsigned integer, got '{raw_value}'"),
                })?,
        };

        insert_at_path(&mut root, spec.path, json_value);
    }

    if root.is_empty() {
        Ok(Value::Null)
    } else {
        Ok(Value::Object(root))
    }
}

/// Insert `value` at a nested `path`, creating intermediate objects.
fn insert_at_path(root: &mut Map<String, Value>, path: &[&str], value: Value) {
    let Some((&field, parents)) = path.split_last() else {
        return;
    };

    let mut current = root;
    for &segment in parents {
        let entry = current
            .entry(segment.to_owned())
            .or_insert_with(|| Value::Object(Map::new()));
        let Some(object) = entry.as_object_mut() else {
            return;
        };
        current = object;
    }

    current.insert(field.to_owned(), value);
}

fn validate(config: &TestpodConfig) -> Result<()> {
    if config.readiness.poll_interval_ms == 0 {
        return Err(ConfigError::InvalidValue {
            field: String::from("readiness.poll_interval_ms"),
            reason: String::from("poll interval must be at least 1 ms"),
        }
        .into());
    }

    if config.probe_host.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            field: String::from("probe_host"),
            reason: String::from("probe host must not be empty"),
        }
        .into());
    }

    Ok(())
}
