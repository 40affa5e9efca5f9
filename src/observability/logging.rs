//! Log format and filter resolution.

use crate::config::LoggingSettings;
use crate::{Error, Result};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Environment variable that overrides every other log filter source.
pub const LOG_FILTER_ENV: &str = "CLINIGRAPH_LOG";

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Parses a format name, case-insensitively.
    ///
    /// Unrecognized names yield `None`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Line format.
    pub format: LogFormat,
    /// Log file; stderr when unset.
    pub file: Option<PathBuf>,
    /// Directive filter.
    pub filter: EnvFilter,
}

impl LoggingConfig {
    /// Builds the logging configuration from settings and the verbose flag.
    ///
    /// The filter is taken from `CLINIGRAPH_LOG`, then `RUST_LOG`, then the
    /// configured filter, and finally defaults to `warn` (`info` when
    /// verbose).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the chosen filter does not parse.
    pub fn from_settings(settings: &LoggingSettings, verbose: bool) -> Result<Self> {
        let format = settings
            .format
            .as_deref()
            .and_then(LogFormat::parse)
            .unwrap_or_default();

        let directives = resolve_directives(
            std::env::var(LOG_FILTER_ENV).ok(),
            std::env::var(EnvFilter::DEFAULT_ENV).ok(),
            settings.filter.clone(),
            verbose,
        );
        let filter = EnvFilter::try_new(&directives)
            .map_err(|e| Error::InvalidInput(format!("log filter {directives:?}: {e}")))?;

        Ok(Self {
            format,
            file: settings.file.clone(),
            filter,
        })
    }
}

const fn default_directive(verbose: bool) -> &'static str {
    if verbose { "info" } else { "warn" }
}

fn resolve_directives(
    crate_env: Option<String>,
    rust_log: Option<String>,
    configured: Option<String>,
    verbose: bool,
) -> String {
    [crate_env, rust_log, configured]
        .into_iter()
        .flatten()
        .find(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default_directive(verbose).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("json", Some(LogFormat::Json); "json")]
    #[test_case("JSON", Some(LogFormat::Json); "uppercase")]
    #[test_case("pretty", Some(LogFormat::Pretty); "pretty")]
    #[test_case("text", Some(LogFormat::Pretty); "text alias")]
    #[test_case("yaml", None; "unknown")]
    fn test_parse_format(value: &str, expected: Option<LogFormat>) {
        assert_eq!(LogFormat::parse(value), expected);
    }

    #[test]
    fn test_directive_precedence() {
        let some = |s: &str| Some(s.to_string());

        assert_eq!(
            resolve_directives(some("debug"), some("trace"), some("error"), false),
            "debug"
        );
        assert_eq!(
            resolve_directives(None, some("trace"), some("error"), false),
            "trace"
        );
        assert_eq!(resolve_directives(None, None, some("error"), true), "error");
        assert_eq!(resolve_directives(None, some("  "), None, false), "warn");
        assert_eq!(resolve_directives(None, None, None, true), "info");
    }

    #[test]
    fn test_from_settings_reads_format_and_file() {
        let settings = LoggingSettings {
            format: Some("json".to_string()),
            file: Some(PathBuf::from("/tmp/clinigraph.log")),
            filter: None,
        };
        let config = LoggingConfig::from_settings(&settings, false).unwrap();

        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.file, Some(PathBuf::from("/tmp/clinigraph.log")));
    }

    #[test]
    fn test_unknown_format_falls_back_to_pretty() {
        let settings = LoggingSettings {
            format: Some("xml".to_string()),
            ..LoggingSettings::default()
        };
        assert_eq!(
            LoggingConfig::from_settings(&settings, false).unwrap().format,
            LogFormat::Pretty
        );
    }

    #[test]
    fn test_invalid_configured_filter_is_rejected() {
        let directives =
            resolve_directives(None, None, Some("clinigraph=notalevel".to_string()), false);
        assert!(EnvFilter::try_new(&directives).is_err());
    }
}
