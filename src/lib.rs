//! Beatswap — beat-aligned audio rearrangement driven by a compact pattern language.
//!
//! Callers supply decoded audio and detector-provided beat boundaries, build a
//! [`Song`], compile pattern text, and render:
//!
//! ```
//! use beatswap::{beatswap, AudioSource, RenderOptions, Song};
//!
//! let audio = AudioSource::mono((0..400).map(|i| i as f32 / 400.0).collect(), 1000)?;
//! let song = Song::from_boundaries(audio, vec![0, 100, 200, 300, 400])?;
//! let out = beatswap(&song, "4,3,2,1r", RenderOptions::seeded(1))?;
//! assert_eq!(out.len(), 400);
//! # Ok::<(), beatswap::BeatswapError>(())
//! ```

pub mod audio;
pub mod beatmap;
pub mod config;
pub mod effect;
pub mod error;
pub mod pattern;
pub mod preset;
pub mod render;

pub use audio::AudioSource;
pub use beatmap::{Beatmap, Song};
pub use error::{BeatswapError, Result};
pub use pattern::{compile, Pattern, PatternError};
pub use render::{render, Repeat, RenderOptions, SourceTable};

/// Compile `pattern` and render it against `song` alone.
pub fn beatswap(song: &Song, pattern: &str, options: RenderOptions) -> Result<AudioSource> {
    let pattern = compile(pattern)?;
    render(&pattern, song, &SourceTable::new(), options)
}
