use std::collections::HashMap;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

use crate::models::Feature;
use crate::render::Style;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("Missing required config key `{0}`")]
    Missing(&'static str),
    #[error("Invalid resample intervals: coarse {coarse_ms}ms, fine {fine_ms}ms")]
    Resample { coarse_ms: u64, fine_ms: u64 },
}

/// Application configuration loaded from a YAML (or TOML) file.
/// All fields have defaults; commands check the keys they need.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Catalog user identity (logged with the session).
    pub username: Option<String>,
    /// Album rendered by the `waveform` command.
    pub album_id: Option<String>,
    /// Albums compared by the `features` command, in plot order.
    pub albums: Vec<String>,
    /// Album name → `#rrggbb` colour for feature charts.
    pub palette: HashMap<String, String>,
    /// Tracks whose name starts with this (case-insensitive) are labelled,
    /// in bold, on the scatter plot.
    pub highlight_prefix: Option<String>,
    /// Feature charted per track for the first album (default danceability).
    pub bar_feature: Feature,
    /// Root of the JSON response cache (default `Data`).
    pub data_dir: Option<PathBuf>,
    /// Where images are written (default `Graphs`).
    pub output_dir: Option<PathBuf>,
    pub catalog: CatalogConfig,
    pub resample: ResampleConfig,
    /// Rendering-style overrides.
    pub style: Style,
}

/// Catalog API settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Total attempts per request, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each subsequent retry.
    pub retry_base_ms: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            max_attempts: 3,
            retry_base_ms: 500,
        }
    }
}

/// Waveform resampling grid widths.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ResampleConfig {
    pub coarse_ms: u64,
    pub fine_ms: u64,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self {
            coarse_ms: crate::DEFAULT_COARSE_MS,
            fine_ms: crate::DEFAULT_FINE_MS,
        }
    }
}

impl ResampleConfig {
    /// Intervals in seconds as `(coarse, fine)`.
    pub fn intervals(&self) -> Result<(f64, f64), ConfigError> {
        if self.coarse_ms == 0 || self.fine_ms == 0 || self.coarse_ms % self.fine_ms != 0 {
            return Err(ConfigError::Resample {
                coarse_ms: self.coarse_ms,
                fine_ms: self.fine_ms,
            });
        }
        Ok((self.coarse_ms as f64 / 1000.0, self.fine_ms as f64 / 1000.0))
    }
}

impl AppConfig {
    /// Load config from `path`, or from `~/.config/albumwave/config.yaml` when
    /// no path is given. A missing default file yields the default config;
    /// an explicit path that can't be read or parsed is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::config_path() {
                Some(p) if p.exists() => p,
                _ => {
                    log::debug!("No config file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::parse(&path, &contents)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse config text; `.toml` files use TOML, everything else YAML.
    pub fn parse(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        let is_toml = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);

        if is_toml {
            toml::from_str(contents).map_err(|source| ConfigError::Toml {
                path: path.display().to_string(),
                source,
            })
        } else {
            // An empty YAML document deserializes as unit, not as a map
            if contents.trim().is_empty() {
                return Ok(Self::default());
            }
            serde_yaml::from_str(contents).map_err(|source| ConfigError::Yaml {
                path: path.display().to_string(),
                source,
            })
        }
    }

    /// Overlay catalog credentials from the environment (`SPOTIPY_CLIENT_ID`,
    /// `SPOTIPY_CLIENT_SECRET`). Environment values win over the file.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(id) = lookup("SPOTIPY_CLIENT_ID").filter(|v| !v.is_empty()) {
            self.catalog.client_id = Some(id);
        }
        if let Some(secret) = lookup("SPOTIPY_CLIENT_SECRET").filter(|v| !v.is_empty()) {
            self.catalog.client_secret = Some(secret);
        }
    }

    pub fn require_album_id(&self) -> Result<&str, ConfigError> {
        self.album_id.as_deref().ok_or(ConfigError::Missing("album_id"))
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| PathBuf::from("Data"))
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| PathBuf::from("Graphs"))
    }

    /// Get the config file path.
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME)
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yaml() {
        let yaml = r##"
username: someone
album_id: 2217d2VN6Nn3zzU9mlApdK
albums:
  - 2217d2VN6Nn3zzU9mlApdK
  - 7n8f4VpR5BAC9IiLiiIWKl
palette:
  Animals: "#d5b785"
resample:
  coarse_ms: 1000
style:
  fill_alpha: 0.4
bar_feature: valence
"##;
        let c = AppConfig::parse(Path::new("cfg.yaml"), yaml).unwrap();
        assert_eq!(c.username.as_deref(), Some("someone"));
        assert_eq!(c.require_album_id().unwrap(), "2217d2VN6Nn3zzU9mlApdK");
        assert_eq!(c.albums.len(), 2);
        assert_eq!(c.palette["Animals"], "#d5b785");
        assert_eq!(c.resample.coarse_ms, 1000);
        assert_eq!(c.resample.fine_ms, 50);
        assert!((c.style.fill_alpha - 0.4).abs() < 1e-12);
        assert_eq!(c.catalog.max_attempts, 3);
        assert_eq!(c.bar_feature, Feature::Valence);
    }

    #[test]
    fn test_parse_toml() {
        let text = r#"
username = "someone"
album_id = "abc"

[catalog]
max_attempts = 5
"#;
        let c = AppConfig::parse(Path::new("config.toml"), text).unwrap();
        assert_eq!(c.username.as_deref(), Some("someone"));
        assert_eq!(c.catalog.max_attempts, 5);
        assert_eq!(c.catalog.retry_base_ms, 500);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let c = AppConfig::parse(Path::new("cfg.yml"), "  \n").unwrap();
        assert!(c.album_id.is_none());
        assert_eq!(c.data_dir(), PathBuf::from("Data"));
        assert_eq!(c.output_dir(), PathBuf::from("Graphs"));
        assert_eq!(c.bar_feature, Feature::Danceability);
    }

    #[test]
    fn test_bad_yaml_is_error() {
        let err = AppConfig::parse(Path::new("cfg.yaml"), "albums: [unterminated").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
    }

    #[test]
    fn test_missing_keys() {
        let c = AppConfig::default();
        assert!(matches!(c.require_album_id(), Err(ConfigError::Missing("album_id"))));
    }

    #[test]
    fn test_env_overrides_file() {
        let mut c = AppConfig::default();
        c.catalog.client_id = Some("from-file".into());
        c.apply_env(|k| match k {
            "SPOTIPY_CLIENT_ID" => Some("from-env".into()),
            "SPOTIPY_CLIENT_SECRET" => Some(String::new()),
            _ => None,
        });
        assert_eq!(c.catalog.client_id.as_deref(), Some("from-env"));
        // Empty env values don't clobber
        assert!(c.catalog.client_secret.is_none());
    }

    #[test]
    fn test_resample_intervals() {
        let r = ResampleConfig::default();
        let (coarse, fine) = r.intervals().unwrap();
        assert!((coarse - 0.5).abs() < 1e-12);
        assert!((fine - 0.05).abs() < 1e-12);

        let bad = ResampleConfig { coarse_ms: 500, fine_ms: 300 };
        assert!(bad.intervals().is_err());
        let zero = ResampleConfig { coarse_ms: 500, fine_ms: 0 };
        assert!(zero.intervals().is_err());
    }

    #[test]
    fn test_load_explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(Some(dir.path().join("nope.yaml").as_path())).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
