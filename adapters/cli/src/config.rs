//! `evacsim.toml` loading.
//!
//! Values are layered: built-in defaults, then the TOML file, then the
//! `EVACSIM_*` environment variables, then command-line flags (applied by
//! the caller).

use std::path::{Path, PathBuf};
use std::time::Duration;

use evacsim_core::{GridCorrection, ModelVersion};
use evacsim_engine_client::PollSettings;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File looked up in the working directory when `--config` is absent.
pub(crate) const DEFAULT_CONFIG_FILE: &str = "evacsim.toml";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

fn invalid(key: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        reason: reason.into(),
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GridConfig {
    pub(crate) cell_size: u32,
    pub(crate) exit_min_distance: f32,
    pub(crate) exit_hit_radius: f32,
    pub(crate) invert_walls: bool,
    pub(crate) invert_wall_threshold: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_size: 3,
            exit_min_distance: 3.0,
            exit_hit_radius: 2.0,
            invert_walls: true,
            invert_wall_threshold: GridCorrection::DEFAULT_THRESHOLD,
        }
    }
}

impl GridConfig {
    pub(crate) fn correction(&self) -> GridCorrection {
        GridCorrection::new(self.invert_walls.then_some(self.invert_wall_threshold))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct EngineConfig {
    pub(crate) base_url: String,
    pub(crate) poll_interval_ms: u64,
    pub(crate) max_poll_attempts: u32,
    pub(crate) request_timeout_secs: u64,
    pub(crate) model: ModelVersion,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_owned(),
            poll_interval_ms: 1000,
            max_poll_attempts: 600,
            request_timeout_secs: 30,
            model: ModelVersion::default(),
        }
    }
}

impl EngineConfig {
    pub(crate) fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_millis(self.poll_interval_ms),
            max_attempts: self.max_poll_attempts,
        }
    }

    pub(crate) fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ApiConfig {
    pub(crate) base_url: String,
    pub(crate) auth_token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_owned(),
            auth_token: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct BuilderConfig {
    pub(crate) canvas_size: u32,
    pub(crate) cells: u32,
    pub(crate) export_size: u32,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            canvas_size: 512,
            cells: 32,
            export_size: 256,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ReplayConfig {
    pub(crate) speed: u8,
    pub(crate) base_frame_delay_ms: u64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            speed: 5,
            base_frame_delay_ms: 500,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct StoreConfig {
    pub(crate) dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".evacsim"),
        }
    }
}

/// Fully resolved configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Config {
    pub(crate) grid: GridConfig,
    pub(crate) engine: EngineConfig,
    pub(crate) api: ApiConfig,
    pub(crate) builder: BuilderConfig,
    pub(crate) replay: ReplayConfig,
    pub(crate) store: StoreConfig,
}

impl Config {
    /// Loads `path`, or `evacsim.toml` when present, then applies `env`.
    ///
    /// An explicit path must exist; the default file is optional.
    pub(crate) fn load<E>(path: Option<&Path>, env: E) -> Result<Self, ConfigError>
    where
        E: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(env);
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub(crate) fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    fn apply_env<E>(&mut self, env: E)
    where
        E: Fn(&str) -> Option<String>,
    {
        if let Some(url) = env("EVACSIM_BACKEND_URL") {
            self.engine.base_url = url;
        }
        if let Some(url) = env("EVACSIM_API_URL") {
            self.api.base_url = url;
        }
        if let Some(dir) = env("EVACSIM_STORE_DIR") {
            self.store.dir = PathBuf::from(dir);
        }
        if let Some(token) = env("EVACSIM_AUTH_TOKEN") {
            self.api.auth_token = Some(token);
        }
    }

    /// Rejects values no component can work with.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.grid.cell_size == 0 {
            return Err(invalid("grid.cell_size", "must be at least 1"));
        }
        if !(self.grid.exit_min_distance >= 0.0) {
            return Err(invalid("grid.exit_min_distance", "must be non-negative"));
        }
        if !(self.grid.exit_hit_radius >= 0.0) {
            return Err(invalid("grid.exit_hit_radius", "must be non-negative"));
        }
        if !(0.0..=1.0).contains(&self.grid.invert_wall_threshold) {
            return Err(invalid("grid.invert_wall_threshold", "must be within 0..=1"));
        }
        if self.engine.poll_interval_ms == 0 {
            return Err(invalid("engine.poll_interval_ms", "must be at least 1"));
        }
        if self.engine.max_poll_attempts == 0 {
            return Err(invalid("engine.max_poll_attempts", "must be at least 1"));
        }
        if self.builder.cells == 0 || self.builder.canvas_size % self.builder.cells != 0 {
            return Err(invalid(
                "builder.cells",
                format!("must divide the {}px canvas evenly", self.builder.canvas_size),
            ));
        }
        if self.builder.export_size == 0 {
            return Err(invalid("builder.export_size", "must be at least 1"));
        }
        if !(1..=10).contains(&self.replay.speed) {
            return Err(invalid("replay.speed", "must be within 1..=10"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate().expect("defaults validate");
        assert_eq!(config.engine.poll_settings(), PollSettings::default());
        assert_eq!(config.grid.correction(), GridCorrection::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = Config::from_toml(
            r#"
            [grid]
            cell_size = 4
            invert_walls = false

            [engine]
            model = "maskable-ppo"
            "#,
        )
        .expect("parses");
        assert_eq!(config.grid.cell_size, 4);
        assert_eq!(config.grid.correction().invert_threshold(), None);
        assert_eq!(config.engine.model, ModelVersion::MaskablePpo);
        assert_eq!(config.engine.max_poll_attempts, 600);
        assert_eq!(config.builder, BuilderConfig::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::from_toml("[grid]\ncell_sise = 3\n").is_err());
    }

    #[test]
    fn environment_overrides_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("evacsim.toml");
        std::fs::write(&path, "[engine]\nbase_url = \"http://file\"\n").expect("write");

        let config = Config::load(Some(&path), |key| {
            (key == "EVACSIM_BACKEND_URL").then(|| "http://env".to_owned())
        })
        .expect("loads");
        assert_eq!(config.engine.base_url, "http://env");
        assert_eq!(config.store.dir, PathBuf::from(".evacsim"));
    }

    #[test]
    fn invalid_values_fail_at_load_time() {
        let dir = tempfile::tempdir().expect("temp dir");
        for (contents, key) in [
            ("[grid]\ncell_size = 0\n", "grid.cell_size"),
            ("[engine]\npoll_interval_ms = 0\n", "engine.poll_interval_ms"),
            ("[replay]\nspeed = 11\n", "replay.speed"),
            ("[builder]\ncells = 30\n", "builder.cells"),
        ] {
            let path = dir.path().join("bad.toml");
            std::fs::write(&path, contents).expect("write");
            match Config::load(Some(&path), no_env) {
                Err(ConfigError::Invalid { key: found, .. }) => assert_eq!(found, key),
                other => panic!("expected {key} to be rejected, got {other:?}"),
            }
        }
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let result = Config::load(Some(Path::new("/definitely/missing.toml")), no_env);
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
