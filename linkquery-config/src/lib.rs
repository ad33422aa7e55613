//! Loader for `linkquery` configuration with file + environment overlays.
//!
//! Precedence, lowest to highest: built-in defaults, config files (in the
//! order they were attached), `LINKQUERY__`-prefixed environment variables.
//! Nested keys use `__` as separator, e.g. `LINKQUERY__HTTP__TIMEOUT_SECS=10`.
//! String values may reference `${VAR}` placeholders, expanded after merging.
//! Command-line flags are applied on top by the binary.
use config::{Config, ConfigError, Environment, File};
use linkquery_common::observability::LogFormat;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const ENV_PREFIX: &str = "LINKQUERY";
const APP_DIR: &str = "linkquery";
const DEFAULT_FILE_NAME: &str = "linkquery.yaml";

/// What to do when the binary is started without a URL argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingArgumentPolicy {
    /// Ask for the URL on the terminal and read one line from stdin.
    #[default]
    Prompt,
    /// Print usage and exit with a non-zero code.
    UsageError,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LinkQueryConfig {
    pub missing_argument: MissingArgumentPolicy,
    /// Collapse `;;` runs and drop spaces after `;` once the base cleanup ran.
    pub extra_cleanup: bool,
    /// Hand the search URL to the default browser after printing it.
    pub open_browser: bool,
    pub http: HttpSettings,
    pub daily: DailySettings,
    pub log: LogSettings,
}

impl Default for LinkQueryConfig {
    fn default() -> Self {
        Self {
            missing_argument: MissingArgumentPolicy::default(),
            extra_cleanup: true,
            open_browser: true,
            http: HttpSettings::default(),
            daily: DailySettings::default(),
            log: LogSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Whole-request timeout for the page fetch.
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 5,
            user_agent: default_user_agent(),
        }
    }
}

fn default_user_agent() -> String {
    concat!("linkquery/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Daily text feed parameters. `r_version` must match the locale
/// (`e` -> 1, `s` -> 4, `vt` -> 47, ...).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DailySettings {
    pub locale: String,
    pub r_version: u32,
}

impl Default for DailySettings {
    fn default() -> Self {
        Self {
            locale: "vt".to_string(),
            r_version: 47,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub dir: Option<PathBuf>,
    pub format: LogFormat,
    pub filter: String,
    /// Mirror log events to stderr.
    pub stderr: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            dir: None,
            format: LogFormat::Text,
            filter: "info".to_string(),
            stderr: false,
        }
    }
}

/// Default per-user config file location, e.g. `~/.config/linkquery/linkquery.yaml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(DEFAULT_FILE_NAME))
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (files + env overrides).
pub struct LinkQueryConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for LinkQueryConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkQueryConfigLoader {
    /// Start from built-in defaults; environment overrides are attached by [`Self::load`].
    ///
    /// ```
    /// use linkquery_config::{LinkQueryConfigLoader, MissingArgumentPolicy};
    ///
    /// let config = LinkQueryConfigLoader::new()
    ///     .with_yaml_str("missing_argument: usage_error\nextra_cleanup: false")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.missing_argument, MissingArgumentPolicy::UsageError);
    /// assert!(!config.extra_cleanup);
    /// assert_eq!(config.http.timeout_secs, 30);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is silently skipped when it does not exist.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Attach the per-user file from [`default_config_path`], if the platform has one.
    pub fn with_default_file(self) -> Self {
        match default_config_path() {
            Some(path) => self.with_optional_file(path),
            None => self,
        }
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly typed config.
    ///
    /// `LINKQUERY__`-prefixed environment variables are layered last so they
    /// win over every file, then `${VAR}` placeholders are expanded.
    pub fn load(self) -> Result<LinkQueryConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: LinkQueryConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;

        Ok(typed)
    }
}
