use std::path::Path;

use anyhow::Result;
use calendar_engine::REFERENCE_ZONE;
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Zone class occurrences are displayed in.
    pub target_zone: String,
    pub feed: FeedConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Zone for feed date-times that carry no UTC marker.
    pub local_zone: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Settings {
    /// Load settings from defaults, a TOML file and `WELLCAL_*` environment
    /// variables, later sources winning.
    ///
    /// With `path` the file must exist; otherwise `wellcal.toml` in the
    /// working directory is read if present. Nested keys use `__` in
    /// environment variables, e.g. `WELLCAL_FEED__LOCAL_ZONE`.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be read or deserialized.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let builder = Config::builder()
            .set_default("target_zone", REFERENCE_ZONE)?
            .set_default("feed.local_zone", "UTC")?
            .set_default("logging.level", "warn")?;

        let builder = match path {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name("wellcal").required(false)),
        };

        Ok(builder
            .add_source(
                Environment::with_prefix("WELLCAL")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize::<Settings>()?)
    }
}
