//! Render configuration — loads optional ~/.beatswap/config.yaml.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::beatmap::Song;
use crate::error::{BeatswapError, Result};
use crate::render::{Repeat, RenderOptions};

/// Render settings loaded from ~/.beatswap/config.yaml.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RenderConfig {
    /// Fixed RNG seed for reproducible renders.
    #[serde(default)]
    pub seed: Option<u64>,
    /// `once` or `fill`.
    #[serde(default)]
    pub repeat: Repeat,
    /// Output clip level.
    #[serde(default = "default_ceiling")]
    pub ceiling: f32,
    /// Beatmap scale applied before rendering.
    #[serde(default = "default_scale")]
    pub scale: f64,
    /// Beatmap shift applied after scaling.
    #[serde(default)]
    pub shift: f64,
}

fn default_ceiling() -> f32 {
    1.0
}

fn default_scale() -> f64 {
    1.0
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            seed: None,
            repeat: Repeat::Once,
            ceiling: default_ceiling(),
            scale: default_scale(),
            shift: 0.0,
        }
    }
}

impl RenderConfig {
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            seed: self.seed,
            repeat: self.repeat,
            ceiling: self.ceiling,
        }
    }

    /// Apply the configured scale and shift to `song`'s beatmap.
    pub fn prepare(&self, song: Song) -> Song {
        let song = if self.scale != 1.0 {
            song.scaled(self.scale)
        } else {
            song
        };
        if self.shift != 0.0 {
            song.shifted(self.shift)
        } else {
            song
        }
    }
}

/// Directory holding beatswap's user files.
pub(crate) fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".beatswap"))
}

/// Load the render config from ~/.beatswap/config.yaml.
/// Returns None if the file doesn't exist or doesn't parse.
pub fn load_config() -> Option<RenderConfig> {
    read_user_config(&config_dir()?.join("config.yaml"))
}

/// A missing file is silent; an unreadable or invalid one is logged.
fn read_user_config(path: &Path) -> Option<RenderConfig> {
    if !path.exists() {
        return None;
    }
    match load_config_from(path) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring config file");
            None
        }
    }
}

/// Load the render config from an explicit path.
pub fn load_config_from(path: impl AsRef<Path>) -> Result<RenderConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    serde_yaml::from_str(&content).map_err(|e| BeatswapError::Config {
        reason: format!("{}: {e}", path.display()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_neutral() {
        let config = RenderConfig::default();
        assert_eq!(config.seed, None);
        assert_eq!(config.repeat, Repeat::Once);
        assert_eq!(config.ceiling, 1.0);
        assert_eq!(config.scale, 1.0);
        assert_eq!(config.shift, 0.0);
    }

    #[test]
    fn missing_config_returns_none_or_parses() {
        // Only asserts that a missing or odd home config doesn't panic.
        let _ = load_config();
    }

    #[test]
    fn parse_yaml_config() {
        let yaml = r#"
seed: 42
repeat: fill
ceiling: 0.9
scale: 2
"#;
        let config: RenderConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.repeat, Repeat::Fill);
        assert_eq!(config.ceiling, 0.9);
        assert_eq!(config.scale, 2.0);
        assert_eq!(config.shift, 0.0);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let config: RenderConfig = serde_yaml::from_str("shift: 0.5").unwrap();
        assert_eq!(config.shift, 0.5);
        assert_eq!(config.scale, 1.0);
        assert_eq!(config.ceiling, 1.0);
    }

    #[test]
    fn render_options_carry_over() {
        let config = RenderConfig {
            seed: Some(3),
            repeat: Repeat::Fill,
            ceiling: 0.5,
            ..RenderConfig::default()
        };
        let opts = config.render_options();
        assert_eq!(opts.seed, Some(3));
        assert_eq!(opts.repeat, Repeat::Fill);
        assert_eq!(opts.ceiling, 0.5);
    }

    #[test]
    fn load_from_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "seed: 7\nrepeat: once").unwrap();
        let config = load_config_from(file.path()).unwrap();
        assert_eq!(config.seed, Some(7));
    }

    #[test]
    fn load_from_bad_yaml_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "repeat: sometimes").unwrap();
        let err = load_config_from(file.path()).unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
    }

    #[test]
    fn user_config_falls_back_on_missing_or_invalid_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        assert_eq!(read_user_config(&path), None);

        std::fs::write(&path, "ceiling: [not, a, number]\n").unwrap();
        assert_eq!(read_user_config(&path), None);

        std::fs::write(&path, "seed: 5\n").unwrap();
        assert_eq!(read_user_config(&path).and_then(|c| c.seed), Some(5));
    }

    #[test]
    fn load_from_missing_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config_from(dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, BeatswapError::Io(_)));
    }

    #[test]
    fn prepare_scales_then_shifts() {
        use crate::audio::AudioSource;
        let audio = AudioSource::mono(vec![0.0; 400], 100).unwrap();
        let song = Song::from_boundaries(audio, vec![0, 100, 200, 300, 400]).unwrap();
        let config = RenderConfig {
            scale: 2.0,
            ..RenderConfig::default()
        };
        assert_eq!(config.prepare(song).beatmap().beat_count(), 8);
    }
}
