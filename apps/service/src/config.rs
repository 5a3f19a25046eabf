use std::time::Duration;
use std::{env, fmt, fs, path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file: {0}")]
    Read(#[source] std::io::Error),

    #[error("could not write config file: {0}")]
    Write(#[source] std::io::Error),

    #[error("could not parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("no usable config directory")]
    ConfigPathUnavailable,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub probe: Probe,
    pub sweep: Sweep,
    pub store: Store,
    pub update: Update,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Probe {
    /// Hard per-probe timeout in milliseconds.
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Sweep {
    /// Period of the sweep loop in seconds.
    pub interval_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Store {
    /// Location of the local key-value database.
    pub path: path::PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Update {
    /// Whether the advisory release check runs at startup.
    pub enabled: bool,
    /// Release metadata endpoint (GitHub releases API shape).
    pub endpoint: String,
}

impl Default for Probe {
    fn default() -> Self {
        Self { timeout_ms: 3_000 }
    }
}

impl Default for Sweep {
    fn default() -> Self {
        Self { interval_seconds: 15 }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self { path: default_store_path() }
    }
}

impl Default for Update {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://api.github.com/repos/obiente/pingmon/releases/latest".into(),
        }
    }
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/pingmon/config.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, ConfigError> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(ConfigError::ConfigPathUnavailable);
    };

    Ok(path.join("pingmon/config.toml"))
}

/// Default store path ($XDG_DATA_HOME/pingmon/pingmon.db or
/// $HOME/.local/share/...), falling back to the working directory.
fn default_store_path() -> path::PathBuf {
    let base = if let Ok(data_home) = env::var("XDG_DATA_HOME") {
        path::PathBuf::from(data_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".local/share")
    } else {
        return path::PathBuf::from("pingmon.db");
    };

    base.join("pingmon/pingmon.db")
}

impl Config {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe.timeout_ms)
    }

    pub fn sweep_period(&self) -> Duration {
        Duration::from_secs(self.sweep.interval_seconds)
    }

    /// Generate Config structure from file
    ///
    /// Creates a default config at ~/.config/pingmon/config.toml, or at
    /// the specified path with a .toml extension, if one does not exist
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, ConfigError> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path).map_err(ConfigError::Read)?;
            Ok(toml::from_str(raw_string.as_str())?)
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            Ok(config)
        }
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &path::Path) -> Result<(), ConfigError> {
        let config_str: String = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ConfigError::Write)?;
        }

        fs::write(path, config_str).map_err(ConfigError::Write)
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);

        writeln!(f, "Current Internal Configuration State:")?;
        write_title_1(f, "Probe")?;
        write_1(f, "Timeout (ms)", &self.probe.timeout_ms)?;
        write_title_1(f, "Sweep")?;
        write_1(f, "Interval (s)", &self.sweep.interval_seconds)?;
        write_title_1(f, "Store")?;
        write_1(f, "Path", &self.store.path.display())?;
        write_title_1(f, "Update")?;
        write_1(f, "Enabled", &self.update.enabled)?;
        write_1(f, "Endpoint", &self.update.endpoint)?;

        Ok(())
    }
}
