//! TOML configuration with environment overrides.
//!
//! # Resolution
//!
//! 1. `ZNP_TRANSPORT_CONFIG` (explicit path)
//! 2. `./znp-transport.toml`
//! 3. `znp-transport.toml` under the platform config directory
//!    (`~/.config/znp-transport/` on Linux, `%APPDATA%\znp-transport\config\` on Windows)
//! 4. Built-in defaults
//!
//! `ZNP_TRANSPORT_<KEY>` variables override file values, e.g.
//! `ZNP_TRANSPORT_PORT=/dev/ttyACM0` or `ZNP_TRANSPORT_MAGIC_NUMBER=0x01`.
//!
//! ```toml
//! [transport]
//! port = "/dev/ttyACM0"
//! magic_number = 0xEF
//!
//! [network]
//! pan_id = 0x1A62
//! channel = 11
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    apply_overrides, default_config_dir, default_config_path, parse_int, resolve_config_path,
    ConfigLoader, CONFIG_FILE_NAME, CONFIG_PATH_ENV, ENV_PREFIX,
};
pub use schema::{
    Config, LogFormat, LoggingConfig, NetworkConfig, NotificationConfig, NotificationModeCfg,
    TransportConfig,
};
