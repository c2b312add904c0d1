//! Runtime settings.
//!
//! Settings come from built-in defaults, an optional TOML file and
//! `SLOWATCH_*` environment variables, later sources overriding earlier ones.
//!
//! ```toml
//! default_time_range = "1d"
//! responses = "responses.json"
//! log_filter = "slowatch=debug"
//! ```

use std::path::{Path, PathBuf};

use anyhow::Result;
use config::{Config, Environment, File};
use serde::Deserialize;
use tracing::warn;

use crate::data::DEFAULT_TIME_RANGE;
use slowatch_types::{parse_duration, Milliseconds};

/// Prefix of the environment variables read into [`Settings`].
pub const ENV_PREFIX: &str = "SLOWATCH";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Time range used when a subscription does not name a valid one.
    pub default_time_range: String,
    /// Responses file backing the `detail` and `queries` commands.
    pub responses: Option<PathBuf>,
    /// Tracing filter used when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_time_range: DEFAULT_TIME_RANGE.to_string(),
            responses: None,
            log_filter: "slowatch=info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from an optional file and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, Environment::with_prefix(ENV_PREFIX))
    }

    fn load_with(path: Option<&Path>, env: Environment) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let settings = builder.add_source(env).build()?.try_deserialize()?;
        Ok(settings)
    }

    /// The default time range, decoded. Falls back to one hour when the
    /// configured value is not a valid duration.
    pub fn default_time_range(&self) -> Milliseconds {
        parse_duration(&self.default_time_range).unwrap_or_else(|err| {
            warn!("Ignoring default_time_range: {}, using {}", err, DEFAULT_TIME_RANGE);
            DEFAULT_TIME_RANGE
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let vars: config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix(ENV_PREFIX).source(Some(vars))
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::load_with(None, env(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.default_time_range(), Milliseconds::from_hours(1));
        assert_eq!(settings.log_filter, "slowatch=info");
    }

    #[test]
    fn test_file_then_env() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "default_time_range = \"1d\"").unwrap();
        writeln!(file, "responses = \"responses.json\"").unwrap();
        writeln!(file, "log_filter = \"slowatch=debug\"").unwrap();

        let settings = Settings::load_with(Some(file.path()), env(&[])).unwrap();
        assert_eq!(settings.default_time_range(), Milliseconds::from_days(1));
        assert_eq!(settings.responses, Some(PathBuf::from("responses.json")));

        let settings = Settings::load_with(
            Some(file.path()),
            env(&[("SLOWATCH_LOG_FILTER", "slowatch=trace")]),
        )
        .unwrap();
        assert_eq!(settings.log_filter, "slowatch=trace");
        assert_eq!(settings.default_time_range, "1d");
    }

    #[test]
    fn test_invalid_time_range_falls_back() {
        let settings = Settings {
            default_time_range: "1h1d".to_string(),
            ..Settings::default()
        };
        assert_eq!(settings.default_time_range(), Milliseconds::from_hours(1));
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(Settings::load_with(Some(Path::new("/nonexistent/slowatch.toml")), env(&[])).is_err());
    }
}
