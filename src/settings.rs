use anyhow::{Context, Result};
use config::{Config, Environment, File};
use log::LevelFilter;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

pub const ENV_PREFIX: &str = "ADMARKET";

/// Server settings, layered as defaults, then the optional config file, then
/// `ADMARKET_*` environment variables.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    /// sqlx SQLite url. Without one markets live in memory only.
    pub db: Option<String>,
    pub log_level: String,
}
impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("host", "127.0.0.1")?
            .set_default("port", 3001_i64)?
            .set_default("log_level", "info")?;
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let settings: Self = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("failed to load settings")?
            .try_deserialize()
            .context("invalid settings")?;
        settings.log_filter()?;
        Ok(settings)
    }
    /// One of `off`, `error`, `warn`, `info`, `debug` or `trace`.
    pub fn log_filter(&self) -> Result<LevelFilter> {
        LevelFilter::from_str(&self.log_level)
            .with_context(|| format!("invalid log_level {:?}", self.log_level))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.host, "127.0.0.1");
        assert_eq!(settings.port, 3001);
        assert_eq!(settings.db, None);
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(file, "port = 4100\ndb = \"sqlite://markets.db\"\nlog_level = \"debug\"").unwrap();
        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.host, "127.0.0.1");
        assert_eq!(settings.port, 4100);
        assert_eq!(settings.db.as_deref(), Some("sqlite://markets.db"));
        assert_eq!(settings.log_level, "debug");
    }

    #[test]
    fn log_level_must_be_known() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(file, "log_level = \"verbose\"").unwrap();
        let err = Settings::load(Some(file.path())).unwrap_err();
        assert!(format!("{:#}", err).contains("invalid log_level \"verbose\""));

        let mut settings = Settings::load(None).unwrap();
        settings.log_level = "DEBUG".into();
        assert_eq!(settings.log_filter().unwrap(), LevelFilter::Debug);
        settings.log_level = "loud".into();
        assert!(settings.log_filter().is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(Settings::load(Some(Path::new("/nonexistent/admarket.toml"))).is_err());
    }
}
