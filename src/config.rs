//! Run configuration.
//!
//! A single immutable [`TomologConfig`] is resolved once at startup from
//! three layers, each overriding the previous one:
//!
//! ```text
//! stock defaults  →  ~/logs/tomolog.conf  →  command-line flags
//! ```
//!
//! The file is optional. Flags are only applied when given on the command
//! line, so an unset flag never masks a value from the file. All layers are
//! merged as `toml::Value` trees before deserialization, so a CLI flag is
//! validated exactly like the same key in the file.
//!
//! ## Config File
//!
//! The file is INI, as written by earlier tomolog releases. Option names are
//! case-insensitive (`PV-prefix` and `pv-prefix` are the same key). Values
//! are plain text, optionally quoted. An empty value or `None` leaves the
//! option unset, except for `beamline` where `None` is a valid choice.
//!
//! ```ini
//! [general]
//! logs-home = /home/user/logs
//! token-home = /home/user/tokens
//! verbose = False
//! config-update = False
//! double-fov = False
//!
//! [file-reading]
//! file-name = .
//!
//! [parameters]
//! idx = -1
//! idy = -1
//! idz = -1
//! max = 0.0
//! min = 0.0
//! beamline = 32-id
//! rec-type = rec
//! pv-prefix = 32idcSP1:
//! presentation-url = https://docs.google.com/presentation/d/<id>/edit
//!
//! [slides]
//! retry-backoff-ms = 0
//! retry-backoff-max-ms = 5000
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use ini::{EscapePolicy, Ini, ParseOption, WriteOption};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the service-account key inside `token-home`.
pub const TOKEN_FILE_NAME: &str = "google_token.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config file parse error: {0}")]
    Ini(#[from] ini::ParseError),
    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("config serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Default location of the config file: `~/logs/tomolog.conf`.
pub fn default_config_path() -> PathBuf {
    home_dir().join("logs").join("tomolog.conf")
}

/// Fully resolved configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct TomologConfig {
    pub general: GeneralConfig,
    pub file_reading: FileReadingConfig,
    pub parameters: ParametersConfig,
    pub slides: SlidesConfig,
}

impl TomologConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.parameters;
        if p.min != 0.0 && p.max != 0.0 && p.min > p.max {
            return Err(ConfigError::Validation(format!(
                "parameters.min ({}) must not exceed parameters.max ({})",
                p.min, p.max
            )));
        }
        if let Some(url) = p
            .presentation_url
            .as_deref()
            .filter(|url| presentation_id_from_url(url).is_none())
        {
            return Err(ConfigError::Validation(format!(
                "parameters.presentation-url has no presentation id: {url}"
            )));
        }
        Ok(())
    }

    /// Path of the service-account key file.
    pub fn token_file(&self) -> PathBuf {
        self.general.token_home.join(TOKEN_FILE_NAME)
    }

    /// Presentation ID extracted from `presentation-url`, if configured.
    pub fn presentation_id(&self) -> Option<String> {
        self.parameters
            .presentation_url
            .as_deref()
            .and_then(presentation_id_from_url)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct GeneralConfig {
    pub logs_home: PathBuf,
    pub token_home: PathBuf,
    pub verbose: bool,
    /// Persist the merged values to the config file after a run.
    pub config_update: bool,
    /// The data set covers 0-360 degrees.
    pub double_fov: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            logs_home: home_dir().join("logs"),
            token_home: home_dir().join("tokens"),
            verbose: false,
            config_update: false,
            double_fov: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileReadingConfig {
    pub file_name: PathBuf,
}

impl Default for FileReadingConfig {
    fn default() -> Self {
        Self {
            file_name: PathBuf::from("."),
        }
    }
}

/// Beamline the slide layout is customized for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Beamline {
    #[serde(rename = "None")]
    Unspecified,
    #[serde(rename = "2-bm")]
    Bm2,
    #[serde(rename = "7-bm")]
    Bm7,
    #[serde(rename = "32-id")]
    Id32,
}

impl fmt::Display for Beamline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unspecified => "None",
            Self::Bm2 => "2-bm",
            Self::Bm7 => "7-bm",
            Self::Id32 => "32-id",
        })
    }
}

/// Prefix of the reconstruction folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecType {
    Recgpu,
    Rec,
}

impl fmt::Display for RecType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Recgpu => "recgpu",
            Self::Rec => "rec",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct ParametersConfig {
    /// Slice indices for reconstruction previews; -1 means the middle slice.
    pub idx: i64,
    pub idy: i64,
    pub idz: i64,
    /// Display thresholds; 0.0 means automatic.
    pub max: f64,
    pub min: f64,
    pub beamline: Beamline,
    pub rec_type: RecType,
    /// PV prefix of the detector camera.
    pub pv_prefix: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presentation_url: Option<String>,
}

impl Default for ParametersConfig {
    fn default() -> Self {
        Self {
            idx: -1,
            idy: -1,
            idz: -1,
            max: 0.0,
            min: 0.0,
            beamline: Beamline::Id32,
            rec_type: RecType::Rec,
            pv_prefix: "32idcSP1:".to_string(),
            presentation_url: None,
        }
    }
}

/// Remote-call tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct SlidesConfig {
    /// Base delay between image insert attempts; 0 retries immediately.
    pub retry_backoff_ms: u64,
    pub retry_backoff_max_ms: u64,
}

impl Default for SlidesConfig {
    fn default() -> Self {
        Self {
            retry_backoff_ms: 0,
            retry_backoff_max_ms: 5000,
        }
    }
}

/// Extract the presentation ID from a Slides URL.
///
/// - `https://docs.google.com/presentation/d/<id>/edit#slide=id.p` → `<id>`
/// - a bare `<id>` is returned as is
pub fn presentation_id_from_url(url: &str) -> Option<String> {
    let url = url.trim();
    let id = match url.split_once("/d/") {
        Some((_, rest)) => rest.split(['/', '?', '#']).next().unwrap_or_default(),
        None if !url.contains('/') => url,
        None => return None,
    };
    (!id.is_empty()).then(|| id.to_string())
}

// =============================================================================
// Layered loading
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(TomologConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// Tables merge key by key; any other overlay value replaces the base value.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Sections in the order they are written.
const SECTIONS: [&str; 4] = ["general", "file-reading", "parameters", "slides"];

/// Options for which the literal `None` is a value rather than "unset".
const NONE_IS_A_VALUE: [(&str, &str); 1] = [("parameters", "beamline")];

/// Read a config file as a raw value tree. A missing file is `Ok(None)`.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let ini = Ini::load_from_str_opt(
        &content,
        ParseOption {
            enabled_escape: false,
            ..ParseOption::default()
        },
    )?;
    Ok(Some(ini_to_value(&ini, &stock_defaults_value()?)?))
}

/// Convert parsed INI sections into a value tree.
///
/// INI values carry no type, so each one takes the type of the stock default
/// it overrides. Options without a stock default stay strings; unknown ones
/// are rejected later by deserialization.
pub fn ini_to_value(ini: &Ini, defaults: &toml::Value) -> Result<toml::Value, ConfigError> {
    let mut root = toml::Value::Table(toml::Table::new());
    for (section, properties) in ini.iter() {
        let Some(section) = section else {
            if properties.iter().next().is_some() {
                return Err(ConfigError::Validation(
                    "config file has options outside of a [section]".into(),
                ));
            }
            continue;
        };
        let section = section.trim().to_ascii_lowercase();

        let mut table = toml::Table::new();
        for (key, raw) in properties.iter() {
            let key = key.trim().to_ascii_lowercase();
            let raw = unquote(raw.trim());
            let none_is_value = NONE_IS_A_VALUE.contains(&(section.as_str(), key.as_str()));
            if raw.is_empty() || (raw == "None" && !none_is_value) {
                continue;
            }
            let default = defaults.get(&section).and_then(|t| t.get(&key));
            let value = typed_value(default, raw).ok_or_else(|| {
                ConfigError::Validation(format!("{section}.{key}: invalid value {raw:?}"))
            })?;
            table.insert(key, value);
        }

        let mut overlay = toml::Table::new();
        overlay.insert(section, toml::Value::Table(table));
        root = merge_toml(root, toml::Value::Table(overlay));
    }
    Ok(root)
}

fn unquote(raw: &str) -> &str {
    ['"', '\'']
        .into_iter()
        .find_map(|quote| raw.strip_prefix(quote)?.strip_suffix(quote))
        .unwrap_or(raw)
}

fn typed_value(default: Option<&toml::Value>, raw: &str) -> Option<toml::Value> {
    Some(match default {
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(parse_bool(raw)?),
        Some(toml::Value::Integer(_)) => toml::Value::Integer(raw.parse().ok()?),
        Some(toml::Value::Float(_)) => toml::Value::Float(raw.parse().ok()?),
        _ => toml::Value::String(raw.to_string()),
    })
}

/// Booleans are spelled the way Python's `configparser` accepts them.
fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Some(true),
        "0" | "no" | "false" | "off" => Some(false),
        _ => None,
    }
}

/// Apply overlays in order on top of `base`, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlays: impl IntoIterator<Item = toml::Value>,
) -> Result<TomologConfig, ConfigError> {
    let merged = overlays.into_iter().fold(base, merge_toml);
    let config: TomologConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Resolve defaults ← `config_path` ← `flags`.
pub fn load_config(config_path: &Path, flags: Overrides) -> Result<TomologConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let file = load_raw_config(config_path)?;
    resolve_config(base, file.into_iter().chain([flags.into_value()]))
}

/// Persist `config` to `path` as INI, creating the parent directory.
///
/// Unset options are left out.
pub fn write_config(path: &Path, config: &TomologConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let value = toml::Value::try_from(config)?;
    let mut ini = Ini::new();
    for section in SECTIONS {
        let Some(table) = value.get(section).and_then(toml::Value::as_table) else {
            continue;
        };
        for (key, value) in table {
            let text = match value {
                toml::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            ini.with_section(Some(section)).set(key.as_str(), text);
        }
    }

    let mut body = b"# tomolog configuration\n\n".to_vec();
    ini.write_to_opt(
        &mut body,
        WriteOption {
            escape_policy: EscapePolicy::Nothing,
            kv_separator: " = ",
            ..WriteOption::default()
        },
    )?;
    fs::write(path, body)?;
    Ok(())
}

/// Values given explicitly on the command line, keyed by section and option.
#[derive(Debug, Clone, Default)]
pub struct Overrides(toml::Table);

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `section.key = value`.
    pub fn set(&mut self, section: &str, key: &str, value: impl Into<toml::Value>) {
        let table = self
            .0
            .entry(section)
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));
        if let toml::Value::Table(table) = table {
            table.insert(key.to_string(), value.into());
        }
    }

    /// Record `section.key = value` only when the flag was given.
    pub fn set_opt<T: Into<toml::Value>>(&mut self, section: &str, key: &str, value: Option<T>) {
        if let Some(value) = value {
            self.set(section, key, value);
        }
    }

    /// Record a switch. Only `true` is ever recorded: an absent switch must
    /// not override `true` from the file.
    pub fn set_flag(&mut self, section: &str, key: &str, on: bool) {
        if on {
            self.set(section, key, true);
        }
    }

    pub fn set_path(&mut self, section: &str, key: &str, value: Option<&Path>) {
        self.set_opt(section, key, value.map(|p| p.to_string_lossy().into_owned()));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_value(self) -> toml::Value {
        toml::Value::Table(self.0)
    }
}

/// Returns a fully commented stock config file.
///
/// Used by the `init` CLI command.
pub fn stock_config() -> &'static str {
    r##"# tomolog configuration
# =====================
# All settings are optional; values shown are the defaults.
# Any option can also be given on the command line (e.g. --beamline 2-bm),
# which takes precedence over this file.
# Unknown keys will cause an error.

[general]
# Log file directory (default: ~/logs)
# logs-home = /home/user/logs

# Directory holding the Google service-account key google_token.json
# (default: ~/tokens)
# token-home = /home/user/tokens

# Debug-level console output
verbose = False

# After `run`, write the merged values back to this file
config-update = False

# Set to True for 0-360 data sets
double-fov = False

[file-reading]
# Name of the hdf file
file-name = .

[parameters]
# Slice ids for reconstruction previews (-1 = middle slice)
idx = -1
idy = -1
idz = -1

# Threshold values for reconstruction previews (0.0 = automatic)
max = 0.0
min = 0.0

# Beamline the slide is customized for: None, 2-bm, 7-bm, 32-id
beamline = 32-id

# Prefix of the reconstruction folder: recgpu, rec
rec-type = rec

# PV prefix of the detector camera
pv-prefix = 32idcSP1:

# Google presentation url (or bare presentation id)
# presentation-url = https://docs.google.com/presentation/d/<id>/edit

[slides]
# Base delay between image insert attempts, doubled per attempt with jitter.
# 0 retries immediately.
retry-backoff-ms = 0

# Upper bound for that delay
retry-backoff-max-ms = 5000
"##
}
