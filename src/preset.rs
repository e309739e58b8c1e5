//! Named presets — a pattern plus the beatmap scale/shift it expects.
//!
//! Preset files are YAML mappings of name → preset:
//!
//! ```yaml
//! double time:
//!   pattern: "1,1,2,2"
//!   scale: 2
//! shuffle:
//!   pattern: "1#a,2#a,3#a,4#a"
//!   scale: [0.5, 1, 2]   # lists are accepted; the first entry is used
//!   repeat: fill         # tile across the whole song
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::beatmap::Beatmap;
use crate::config::config_dir;
use crate::error::{BeatswapError, Result};
use crate::pattern::{compile, Pattern, PatternError};
use crate::render::{RenderOptions, Repeat};

/// A beatmap scale given as one number or a list of candidates.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ScaleSetting {
    Single(f64),
    List(Vec<f64>),
}

impl ScaleSetting {
    /// The scale to apply; the first list entry, or 1.0 for an empty list.
    pub fn value(&self) -> f64 {
        match self {
            ScaleSetting::Single(v) => *v,
            ScaleSetting::List(values) => values.first().copied().unwrap_or(1.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Preset {
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<ScaleSetting>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shift: Option<f64>,
    /// Overrides the caller's repeat mode when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<Repeat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Preset {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            scale: None,
            shift: None,
            repeat: None,
            description: None,
        }
    }

    /// Apply this preset's scale, then its shift.
    pub fn prepare(&self, beatmap: &Beatmap) -> Beatmap {
        let scaled = match &self.scale {
            Some(scale) => beatmap.scale(scale.value()),
            None => beatmap.clone(),
        };
        match self.shift {
            Some(amount) => scaled.shift(amount),
            None => scaled,
        }
    }

    pub fn compile(&self) -> std::result::Result<Pattern, PatternError> {
        compile(&self.pattern)
    }

    /// `base` with this preset's repeat mode applied.
    pub fn render_options(&self, base: RenderOptions) -> RenderOptions {
        RenderOptions {
            repeat: self.repeat.unwrap_or(base.repeat),
            ..base
        }
    }
}

/// Presets by name, in the order they were defined.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresetBook {
    entries: Vec<(String, Preset)>,
}

impl PresetBook {
    /// The presets shipped with the crate. Each one tiles across the song.
    pub fn builtin() -> Self {
        let mut book = Self::default();
        let described = |pattern: &str, description: &str| Preset {
            repeat: Some(Repeat::Fill),
            description: Some(description.to_string()),
            ..Preset::new(pattern)
        };
        book.insert("reverse", described("1r", "every beat played backwards"));
        book.insert(
            "half",
            Preset {
                scale: Some(ScaleSetting::Single(0.5)),
                ..described("1", "half-time feel from doubled beat length")
            },
        );
        book.insert("shuffle", described("1#a,2#a,3#a,4#a", "beats of each bar in random order"));
        book.insert("stutter", described("1>0.5,1>0.5,2", "first half of a beat twice"));
        book.insert("swap", described("2,1", "every second beat swapped with the first"));
        book
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let mapping: serde_yaml::Mapping =
            serde_yaml::from_str(yaml).map_err(|e| BeatswapError::Config {
                reason: format!("presets: {e}"),
            })?;
        let mut book = Self::default();
        for (key, value) in mapping {
            let name = match key {
                serde_yaml::Value::String(name) => name,
                other => {
                    return Err(BeatswapError::Config {
                        reason: format!("preset name must be a string, got {other:?}"),
                    })
                }
            };
            let preset: Preset = serde_yaml::from_value(value).map_err(|e| BeatswapError::Config {
                reason: format!("preset '{name}': {e}"),
            })?;
            book.insert(name, preset);
        }
        Ok(book)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Builtins merged with ~/.beatswap/presets.yaml when it exists.
    /// An unreadable or invalid file falls back to the builtins.
    pub fn load_default() -> Self {
        let builtin = Self::builtin();
        let Some(path) = config_dir().map(|d| d.join("presets.yaml")) else {
            return builtin;
        };
        if !path.exists() {
            return builtin;
        }
        match Self::load(&path) {
            Ok(user) => builtin.merge(user),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring preset file");
                builtin
            }
        }
    }

    /// Add or replace a preset. Replacing keeps the original position.
    pub fn insert(&mut self, name: impl Into<String>, preset: Preset) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = preset,
            None => self.entries.push((name, preset)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Preset> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// `self` overlaid with `other`; `other` wins on name clashes.
    pub fn merge(mut self, other: PresetBook) -> Self {
        for (name, preset) in other.entries {
            self.insert(name, preset);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
