//! Configuration file resolution and environment overrides.

use super::error::{ConfigError, ConfigResult};
use super::schema::{Config, NotificationModeCfg};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "ZNP_TRANSPORT";

/// Config file name, both in the working directory and the platform config dir
pub const CONFIG_FILE_NAME: &str = "znp-transport.toml";

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "ZNP_TRANSPORT_CONFIG";

/// Loads a [`Config`] and remembers where it came from.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using the standard resolution order.
    ///
    /// 1. `ZNP_TRANSPORT_CONFIG` (explicit path, must exist)
    /// 2. `./znp-transport.toml`
    /// 3. `znp-transport.toml` in the platform config directory
    /// 4. Built-in defaults
    ///
    /// Environment overrides are applied last and the result is validated.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path()?;

        let mut config = match config_path {
            Some(ref path) => load_from_file(path)?,
            None => Config::default(),
        };
        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Defaults plus environment overrides; malformed variables are ignored.
    pub fn with_defaults() -> Self {
        let mut config = Config::default();
        let _ = apply_env_overrides(&mut config);

        Self {
            config_path: None,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn into_config(self) -> Config {
        self.config
    }

    /// Save the current configuration to a specific file.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        save_to_file(&self.config, path.as_ref())
    }

    /// Re-read the file this loader was built from, if any.
    pub fn reload(&mut self) -> ConfigResult<()> {
        if let Some(ref path) = self.config_path {
            let mut config = load_from_file(path)?;
            apply_env_overrides(&mut config)?;
            config.validate()?;
            self.config = config;
        }
        Ok(())
    }
}

/// Resolve the configuration file path.
///
/// An explicit `ZNP_TRANSPORT_CONFIG` that points nowhere is an error rather
/// than a silent fallback to defaults.
pub fn resolve_config_path() -> ConfigResult<Option<PathBuf>> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        return if path.exists() {
            Ok(Some(path))
        } else {
            Err(ConfigError::NotFound(path))
        };
    }

    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Ok(Some(cwd_config));
    }

    Ok(default_config_path().filter(|path| path.exists()))
}

/// Platform config directory for this tool, e.g. `~/.config/znp-transport`.
pub fn default_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "znp-transport").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Where `config init` writes a fresh file.
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(ConfigError::ParseError)
}

fn save_to_file(config: &Config, path: &Path) -> ConfigResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Parse an unsigned integer written in decimal or `0x` hexadecimal.
///
/// ```
/// use znp_transport::config::parse_int;
///
/// assert_eq!(parse_int::<u8>("0xEF"), Ok(0xEF));
/// assert_eq!(parse_int::<u8>("239"), Ok(239));
/// assert!(parse_int::<u8>("0x100").is_err());
/// ```
pub fn parse_int<T>(raw: &str) -> Result<T, String>
where
    T: TryFrom<u64>,
{
    let raw = raw.trim();
    let value = match raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16).map_err(|e| e.to_string())?,
        None => raw.parse::<u64>().map_err(|e| e.to_string())?,
    };
    T::try_from(value).map_err(|_| format!("{raw} is out of range"))
}

/// Apply `ZNP_TRANSPORT_*` variables from the process environment.
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    apply_overrides(config, |name| std::env::var(name).ok())
}

/// Apply overrides from any variable source.
///
/// Recognised variables (all prefixed with `ZNP_TRANSPORT_`): `PORT`,
/// `MAGIC_NUMBER`, `BAUD_RATE`, `ACQUIRE_TIMEOUT_MS`, `RECEIVE_TIMEOUT_MS`,
/// `NOTIFICATION`, `PAN_ID`, `CHANNEL`, `LOG_LEVEL`.
pub fn apply_overrides<F>(config: &mut Config, lookup: F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| {
        let name = format!("{ENV_PREFIX}_{key}");
        lookup(&name).map(|value| (name, value))
    };

    if let Some((_, val)) = var("PORT") {
        config.transport.port = Some(val);
    }
    if let Some((name, val)) = var("MAGIC_NUMBER") {
        config.transport.magic_number =
            parse_int(&val).map_err(|msg| ConfigError::env_parse(name, msg))?;
    }
    if let Some((name, val)) = var("BAUD_RATE") {
        config.transport.baud_rate =
            parse_int(&val).map_err(|msg| ConfigError::env_parse(name, msg))?;
    }
    if let Some((name, val)) = var("ACQUIRE_TIMEOUT_MS") {
        config.transport.acquire_timeout_ms =
            parse_int(&val).map_err(|msg| ConfigError::env_parse(name, msg))?;
    }
    if let Some((name, val)) = var("RECEIVE_TIMEOUT_MS") {
        config.transport.receive_timeout_ms =
            parse_int(&val).map_err(|msg| ConfigError::env_parse(name, msg))?;
    }
    if let Some((name, val)) = var("NOTIFICATION") {
        config.transport.notification.mode = match val.to_ascii_lowercase().as_str() {
            "signal" => NotificationModeCfg::Signal,
            "disabled" | "off" => NotificationModeCfg::Disabled,
            other => {
                return Err(ConfigError::env_parse(
                    name,
                    format!("unknown notification mode '{other}'"),
                ))
            }
        };
    }
    if let Some((name, val)) = var("PAN_ID") {
        config.network.pan_id = parse_int(&val).map_err(|msg| ConfigError::env_parse(name, msg))?;
    }
    if let Some((name, val)) = var("CHANNEL") {
        config.network.channel =
            parse_int(&val).map_err(|msg| ConfigError::env_parse(name, msg))?;
    }
    if let Some((_, val)) = var("LOG_LEVEL") {
        config.logging.level = val;
    }

    Ok(())
}
