use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::preview::{
    DEFAULT_CACHE_SIZE, DEFAULT_WORKERS, PipelineConfig, RenderPolicy, WidthPolicy,
};

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "extractview";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default = "default_min_page_width")]
    pub min_page_width: f32,

    #[serde(default = "default_max_page_width")]
    pub max_page_width: f32,

    #[serde(default = "default_fallback_page_width")]
    pub fallback_page_width: f32,

    #[serde(default = "default_container_gutter")]
    pub container_gutter: f32,

    #[serde(default)]
    pub render_policy: RenderPolicy,

    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_min_page_width() -> f32 {
    WidthPolicy::DEFAULT_MIN_WIDTH
}

fn default_max_page_width() -> f32 {
    WidthPolicy::DEFAULT_MAX_WIDTH
}

fn default_fallback_page_width() -> f32 {
    WidthPolicy::DEFAULT_FALLBACK_WIDTH
}

fn default_container_gutter() -> f32 {
    WidthPolicy::DEFAULT_GUTTER
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_cache_size() -> usize {
    DEFAULT_CACHE_SIZE
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            min_page_width: default_min_page_width(),
            max_page_width: default_max_page_width(),
            fallback_page_width: default_fallback_page_width(),
            container_gutter: default_container_gutter(),
            render_policy: RenderPolicy::default(),
            workers: default_workers(),
            cache_size: default_cache_size(),
        }
    }
}

/// `<config dir>/extractview/config.yaml`
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

impl Settings {
    /// Load settings from `path`, or from the default location when `None`.
    ///
    /// A missing file yields defaults. Values are sanitized after parsing.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match default_config_path() {
                Some(path) => path,
                None => {
                    debug!("No config directory available, using default settings");
                    return Ok(Self::default());
                }
            },
        };

        if !path.exists() {
            debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(|source| SettingsError::Read {
            path: path.clone(),
            source,
        })?;
        let settings = Self::from_yaml(&content).map_err(|source| SettingsError::Parse {
            path: path.clone(),
            source,
        })?;

        info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Parse and sanitize settings from YAML text
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Settings = serde_yaml::from_str(content)?;
        Ok(settings.sanitized())
    }

    /// Repair values that would break the pipeline
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        if self.version > CURRENT_VERSION {
            warn!(
                "Settings version {} is newer than supported {CURRENT_VERSION}",
                self.version
            );
        }

        let positive = |value: f32, fallback: f32| {
            if value.is_finite() && value > 0.0 {
                value
            } else {
                fallback
            }
        };
        self.min_page_width = positive(self.min_page_width, default_min_page_width());
        self.max_page_width = positive(self.max_page_width, default_max_page_width());
        self.fallback_page_width =
            positive(self.fallback_page_width, default_fallback_page_width());
        if !self.container_gutter.is_finite() || self.container_gutter < 0.0 {
            self.container_gutter = 0.0;
        }

        if self.min_page_width > self.max_page_width {
            warn!(
                "min_page_width {} exceeds max_page_width {}, swapping",
                self.min_page_width, self.max_page_width
            );
            std::mem::swap(&mut self.min_page_width, &mut self.max_page_width);
        }

        self.workers = self.workers.max(1);
        self.cache_size = self.cache_size.max(1);
        self
    }

    #[must_use]
    pub fn width_policy(&self) -> WidthPolicy {
        WidthPolicy {
            min_width: self.min_page_width,
            max_width: self.max_page_width,
            fallback_width: self.fallback_page_width,
            gutter: self.container_gutter,
        }
    }

    #[must_use]
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            width_policy: self.width_policy(),
            render_policy: self.render_policy,
            workers: self.workers,
            cache_size: self.cache_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_gives_defaults() {
        assert_eq!(Settings::from_yaml("").expect("parses"), Settings::default());
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let settings = Settings::from_yaml("render_policy: lazy\nworkers: 4\n").expect("parses");

        assert_eq!(settings.render_policy, RenderPolicy::Lazy);
        assert_eq!(settings.workers, 4);
        assert_eq!(settings.max_page_width, 900.0);
    }

    #[test]
    fn invalid_values_are_sanitized() {
        let settings = Settings::from_yaml(
            "min_page_width: 1000\nmax_page_width: 300\nworkers: 0\ncache_size: 0\ncontainer_gutter: -4\n",
        )
        .expect("parses");

        assert_eq!(settings.min_page_width, 300.0);
        assert_eq!(settings.max_page_width, 1000.0);
        assert_eq!(settings.workers, 1);
        assert_eq!(settings.cache_size, 1);
        assert_eq!(settings.container_gutter, 0.0);
    }

    #[test]
    fn unknown_policy_is_an_error() {
        assert!(Settings::from_yaml("render_policy: sometimes\n").is_err());
    }

    #[test]
    fn load_reads_file_and_tolerates_missing_one() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.yaml");

        let missing = Settings::load(Some(&path)).expect("missing file is fine");
        assert_eq!(missing, Settings::default());

        fs::write(&path, "fallback_page_width: 500\n").expect("write config");
        let loaded = Settings::load(Some(&path)).expect("loads");
        assert_eq!(loaded.pipeline_config().width_policy.fallback_width, 500.0);
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.yaml");
        fs::write(&path, "workers: [not, a, number]\n").expect("write config");

        let err = Settings::load(Some(&path)).unwrap_err();
        assert!(matches!(err, SettingsError::Parse { .. }));
        assert!(err.to_string().contains("config.yaml"));
    }
}
