use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{
    Config, DataSettings, DataSourceKind, IndexSettings, LoggingSettings, OutputSettings,
};

/// Prefix for environment overrides, e.g. `TRACKER_INDEX__CONSTITUENT_COUNT=50`.
pub const ENV_PREFIX: &str = "TRACKER";

/// Loads and validates the application configuration.
///
/// Reads the TOML file at `path`, layers `TRACKER_<SECTION>__<KEY>` environment
/// variables on top, deserializes into our strongly-typed `Config` struct and
/// validates it. Any failure here is fatal: no partial run is attempted.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(environment())
        .build()?;

    finish(builder)
}

/// Same as [`load_config`], but reads the TOML document from a string.
pub fn load_config_from_str(toml: &str) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from_str(toml, config::FileFormat::Toml))
        .add_source(environment())
        .build()?;

    finish(builder)
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

fn finish(builder: config::Config) -> Result<Config, ConfigError> {
    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;
    Ok(config)
}
