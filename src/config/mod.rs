//! Configuration management.
//!
//! Settings come from, in increasing precedence: built-in defaults, a TOML
//! config file, and command-line flags applied by the binary. The config file
//! is the path given with `--config`, else `CLINIGRAPH_CONFIG_PATH`, else the
//! first `clinigraph/config.toml` found under the platform config directory
//! or `~/.config`.
//!
//! # Example File
//!
//! ```toml
//! store_path = "/var/lib/clinigraph/graph.db"
//! output_path = "graph_output.html"
//! sample_size = 50
//! edge_limit = 1000
//!
//! [layout]
//! seed = 42
//! iterations = 50
//!
//! [logging]
//! format = "json"
//! filter = "clinigraph=debug"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "CLINIGRAPH_CONFIG_PATH";

/// File name of the readiness marker written beside the output.
pub const STATE_FILE_NAME: &str = "knowledge_graph_state.json";

/// Main configuration for clinigraph.
#[derive(Debug, Clone, PartialEq)]
pub struct ClinigraphConfig {
    /// Path to the `SQLite` graph store.
    pub store_path: PathBuf,
    /// Path the HTML scene is written to.
    pub output_path: PathBuf,
    /// Path of the readiness marker; beside the output when unset.
    pub state_path: Option<PathBuf>,
    /// Number of leading input rows ingested per run.
    pub sample_size: usize,
    /// Maximum number of edges enumerated for the scene.
    pub edge_limit: usize,
    /// Layout engine settings.
    pub layout: LayoutSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Layout engine settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutSettings {
    /// Seed for the initial node positions.
    pub seed: u64,
    /// Maximum number of simulation steps.
    pub iterations: usize,
    /// Mean per-node movement below which the simulation stops early.
    pub threshold: f64,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            seed: 42,
            iterations: 50,
            threshold: 1e-4,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Output format: `pretty` or `json`.
    pub format: Option<String>,
    /// Optional log file; logs go to stderr when unset.
    pub file: Option<PathBuf>,
    /// `EnvFilter` directive used when no environment filter is set.
    pub filter: Option<String>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Graph store path.
    pub store_path: Option<String>,
    /// Output HTML path.
    pub output_path: Option<String>,
    /// Readiness marker path.
    pub state_path: Option<String>,
    /// Sample size.
    pub sample_size: Option<usize>,
    /// Edge limit.
    pub edge_limit: Option<usize>,
    /// Layout section.
    pub layout: Option<ConfigFileLayout>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
}

/// Layout section in config file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileLayout {
    /// Seed.
    pub seed: Option<u64>,
    /// Iterations.
    pub iterations: Option<usize>,
    /// Convergence threshold.
    pub threshold: Option<f64>,
}

/// Logging section in config file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileLogging {
    /// Format.
    pub format: Option<String>,
    /// Log file.
    pub file: Option<String>,
    /// Filter directive.
    pub filter: Option<String>,
}

impl Default for ClinigraphConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("clinigraph.db"),
            output_path: PathBuf::from("graph_output.html"),
            state_path: None,
            sample_size: crate::io::DEFAULT_SAMPLE_SIZE,
            edge_limit: crate::services::DEFAULT_EDGE_LIMIT,
            layout: LayoutSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl ClinigraphConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration for a run.
    ///
    /// An explicit path wins over `CLINIGRAPH_CONFIG_PATH`, which wins over
    /// [`Self::load_default`].
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named file cannot be read or parsed.
    pub fn load(explicit: Option<&Path>) -> crate::Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_file(path);
        }
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            if !path.trim().is_empty() {
                return Self::load_from_file(Path::new(&path));
            }
        }
        Ok(Self::load_default())
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> crate::Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| crate::Error::OperationFailed {
                operation: "read_config_file".to_string(),
                cause: format!("{}: {e}", path.display()),
            })?;

        Self::from_toml(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid config file.
    pub fn from_toml(contents: &str) -> crate::Result<Self> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| crate::Error::OperationFailed {
                operation: "parse_config_file".to_string(),
                cause: e.to_string(),
            })?;

        let config = Self::from_config_file(file);
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/clinigraph/` on macOS)
    /// 2. XDG config dir (`~/.config/clinigraph/` for Unix compatibility)
    ///
    /// Returns default configuration if no config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let platform_config = base_dirs.config_dir().join("clinigraph").join("config.toml");
        let xdg_config = base_dirs
            .home_dir()
            .join(".config")
            .join("clinigraph")
            .join("config.toml");

        for candidate in [platform_config, xdg_config] {
            if !candidate.exists() {
                continue;
            }
            match Self::load_from_file(&candidate) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!(
                        path = %candidate.display(),
                        error = %e,
                        "Ignoring unreadable config file"
                    );
                },
            }
        }

        Self::default()
    }

    /// Converts a `ConfigFile` to `ClinigraphConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(store_path) = file.store_path {
            config.store_path = PathBuf::from(store_path);
        }
        if let Some(output_path) = file.output_path {
            config.output_path = PathBuf::from(output_path);
        }
        config.state_path = file.state_path.map(PathBuf::from);
        if let Some(sample_size) = file.sample_size {
            config.sample_size = sample_size;
        }
        if let Some(edge_limit) = file.edge_limit {
            config.edge_limit = edge_limit;
        }
        if let Some(layout) = file.layout {
            if let Some(seed) = layout.seed {
                config.layout.seed = seed;
            }
            if let Some(iterations) = layout.iterations {
                config.layout.iterations = iterations;
            }
            if let Some(threshold) = layout.threshold {
                config.layout.threshold = threshold;
            }
        }
        if let Some(logging) = file.logging {
            config.logging.format = logging.format;
            config.logging.file = logging.file.map(PathBuf::from);
            config.logging.filter = logging.filter;
        }

        config
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidInput`] if the layout threshold is
    /// negative or not finite.
    pub fn validate(&self) -> crate::Result<()> {
        if !self.layout.threshold.is_finite() || self.layout.threshold < 0.0 {
            return Err(crate::Error::InvalidInput(format!(
                "layout threshold must be a finite non-negative number, got {}",
                self.layout.threshold
            )));
        }
        Ok(())
    }

    /// Returns where the readiness marker is written.
    #[must_use]
    pub fn resolved_state_path(&self) -> PathBuf {
        self.state_path.clone().unwrap_or_else(|| {
            self.output_path
                .parent()
                .map_or_else(|| PathBuf::from(STATE_FILE_NAME), |dir| dir.join(STATE_FILE_NAME))
        })
    }

    /// Sets the graph store path.
    #[must_use]
    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = path.into();
        self
    }

    /// Sets the output path.
    #[must_use]
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    /// Sets the readiness marker path.
    #[must_use]
    pub fn with_state_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_path = Some(path.into());
        self
    }

    /// Sets the sample size.
    #[must_use]
    pub const fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    /// Sets the edge limit.
    #[must_use]
    pub const fn with_edge_limit(mut self, edge_limit: usize) -> Self {
        self.edge_limit = edge_limit;
        self
    }

    /// Sets the layout seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.layout.seed = seed;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClinigraphConfig::default();
        assert_eq!(config.sample_size, 50);
        assert_eq!(config.edge_limit, 1000);
        assert_eq!(config.layout.seed, 42);
        assert_eq!(config.layout.iterations, 50);
        assert_eq!(config.output_path, PathBuf::from("graph_output.html"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_overrides() {
        let config = ClinigraphConfig::from_toml(
            r#"
            store_path = "/tmp/graph.db"
            sample_size = 10

            [layout]
            seed = 7

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.store_path, PathBuf::from("/tmp/graph.db"));
        assert_eq!(config.sample_size, 10);
        assert_eq!(config.edge_limit, 1000);
        assert_eq!(config.layout.seed, 7);
        assert_eq!(config.layout.iterations, 50);
        assert_eq!(config.logging.format.as_deref(), Some("json"));
    }

    #[test]
    fn test_from_toml_rejects_unknown_keys() {
        assert!(ClinigraphConfig::from_toml("neo4j_uri = \"bolt://x\"").is_err());
    }

    #[test]
    fn test_from_toml_rejects_negative_threshold() {
        let err = ClinigraphConfig::from_toml("[layout]\nthreshold = -1.0").unwrap_err();
        assert!(matches!(err, crate::Error::InvalidInput(_)));
    }

    #[test]
    fn test_load_from_missing_file() {
        let err = ClinigraphConfig::load_from_file(Path::new("/nonexistent/config.toml"));
        assert!(err.is_err());
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "edge_limit = 5\n").unwrap();

        let config = ClinigraphConfig::load(Some(&path)).unwrap();
        assert_eq!(config.edge_limit, 5);
    }

    #[test]
    fn test_state_path_defaults_beside_output() {
        let config = ClinigraphConfig::default().with_output_path("/srv/out/graph.html");
        assert_eq!(
            config.resolved_state_path(),
            PathBuf::from("/srv/out/knowledge_graph_state.json")
        );

        let config = config.with_state_path("/tmp/state.json");
        assert_eq!(config.resolved_state_path(), PathBuf::from("/tmp/state.json"));
    }

    #[test]
    fn test_relative_output_state_path() {
        let config = ClinigraphConfig::default();
        assert_eq!(
            config.resolved_state_path(),
            PathBuf::from("knowledge_graph_state.json")
        );
    }
}
