//! Configuration loading from TOML files and `TELEGEN_*` environment overrides

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use telegen_core::{GeneratorConfig, SinkKind, SinkSettings};
use telegen_producers::{ProducerKind, ProducerSettings};

/// Global configuration for telegen
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub input: InputConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Producer name, see [`ProducerKind::from_name`]
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub generator: GeneratorConfig,
    #[serde(flatten)]
    pub producers: ProducerSettings,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            kind: ProducerKind::Logs.name().to_string(),
            generator: GeneratorConfig::default(),
            producers: ProducerSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// `file`, `debug` or `http`
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub sinks: SinkSettings,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            kind: SinkKind::Debug.name().to_string(),
            sinks: SinkSettings::default(),
        }
    }
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./telegen.toml (current directory)
    /// 2. ~/.config/telegen/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("telegen.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "telegen") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.expand_env_vars();

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Resolve `${VAR}` references in the output settings.
    ///
    /// An unset variable clears the token and drops the header; in the URL
    /// and the file path it leaves an empty value, which fails once the sink
    /// is built or first written to.
    fn expand_env_vars(&mut self) {
        let sinks = &mut self.output.sinks;
        sinks.http.token = sinks.http.token.as_deref().and_then(expand_env_var);
        sinks.http.url = expand_env_var(&sinks.http.url).unwrap_or_default();
        sinks.http.headers = std::mem::take(&mut sinks.http.headers)
            .into_iter()
            .filter_map(|(name, value)| expand_env_var(&value).map(|v| (name, v)))
            .collect();
        if let Some(path) = sinks.file.path.to_str() {
            sinks.file.path = PathBuf::from(expand_env_var(path).unwrap_or_default());
        }
    }

    /// Apply `TELEGEN_*` variables from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`; empty values are ignored
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let number = |name: &str| -> Result<Option<u64>> {
            get(name)
                .map(|v| {
                    v.trim()
                        .parse::<u64>()
                        .with_context(|| format!("{name}={v:?} is not a number"))
                })
                .transpose()
        };

        let input = &mut self.input;
        if let Some(v) = get("TELEGEN_INPUT_TYPE") {
            input.kind = v;
        }
        if let Some(v) = get("TELEGEN_DELAY") {
            input.generator.delay = v;
        }
        if let Some(v) = get("TELEGEN_BATCHING") {
            input.generator.batching = v;
        }
        if let Some(v) = get("TELEGEN_MAX_RUNTIME") {
            input.generator.max_runtime = v;
        }
        if let Some(v) = number("TELEGEN_MAX_TOTAL_RECORDS")? {
            input.generator.max_total_records = v;
        }
        if let Some(v) = number("TELEGEN_AZURE_RECORDS_PER_EVENT")? {
            input.producers.azure.records_per_event = v as usize;
        }

        let output = &mut self.output;
        if let Some(v) = get("TELEGEN_OUTPUT_TYPE") {
            output.kind = v;
        }
        if let Some(v) = get("TELEGEN_FILE_PATH") {
            output.sinks.file.path = PathBuf::from(v);
        }
        if let Some(v) = get("TELEGEN_HTTP_URL") {
            output.sinks.http.url = v;
        }
        Ok(())
    }

    pub fn input_kind(&self) -> Result<ProducerKind> {
        ProducerKind::from_name(&self.input.kind).with_context(|| {
            let known: Vec<_> = ProducerKind::ALL.iter().map(|k| k.name()).collect();
            format!(
                "unknown input type {:?} (expected one of: {})",
                self.input.kind,
                known.join(", ")
            )
        })
    }

    pub fn output_kind(&self) -> Result<SinkKind> {
        SinkKind::from_name(&self.output.kind).with_context(|| {
            let known: Vec<_> = SinkKind::ALL.iter().map(|k| k.name()).collect();
            format!(
                "unknown output type {:?} (expected one of: {})",
                self.output.kind,
                known.join(", ")
            )
        })
    }
}
