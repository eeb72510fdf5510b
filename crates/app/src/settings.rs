//! Handles settings for the application. Configuration is read from an
//! optional `settings.toml` and `CHIPIN__*` environment variables, e.g.
//! `CHIPIN__APP__LEVEL=debug`.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

#[derive(Debug, Deserialize)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub database: Database,
}

impl Settings {
    /// `path` must exist when given; the default `settings` file is optional.
    pub fn new(path: Option<&str>) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("app.level", "info")?
            .set_default("database.url", "sqlite:./chipin.db?mode=rwc")?
            .add_source(File::with_name(path.unwrap_or("settings")).required(path.is_some()))
            .add_source(Environment::with_prefix("CHIPIN").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}
