//! A song: one audio source paired with the beatmap derived from it.

use crate::audio::AudioSource;
use crate::error::{BeatswapError, Result};

use super::Beatmap;

/// An [`AudioSource`] together with its [`Beatmap`].
#[derive(Debug, Clone, PartialEq)]
pub struct Song {
    audio: AudioSource,
    beatmap: Beatmap,
}

impl Song {
    /// Pair audio with a beatmap built against the same source length.
    pub fn new(audio: AudioSource, beatmap: Beatmap) -> Result<Self> {
        if beatmap.source_len() != audio.len() {
            return Err(BeatswapError::invalid_beatmap(format!(
                "beatmap was built for {} samples but the audio has {}",
                beatmap.source_len(),
                audio.len()
            )));
        }
        Ok(Self { audio, beatmap })
    }

    /// Validate detector boundaries against `audio` and pair them.
    pub fn from_boundaries(audio: AudioSource, boundaries: impl Into<Vec<usize>>) -> Result<Self> {
        let beatmap = Beatmap::build(boundaries, audio.len())?;
        Ok(Self { audio, beatmap })
    }

    pub fn audio(&self) -> &AudioSource {
        &self.audio
    }

    pub fn beatmap(&self) -> &Beatmap {
        &self.beatmap
    }

    pub fn sample_rate(&self) -> u32 {
        self.audio.sample_rate()
    }

    pub fn into_parts(self) -> (AudioSource, Beatmap) {
        (self.audio, self.beatmap)
    }

    /// The same audio with its beatmap scaled by `factor`.
    pub fn scaled(self, factor: f64) -> Self {
        let beatmap = self.beatmap.scale(factor);
        Self { beatmap, ..self }
    }

    /// The same audio with its beatmap shifted by `amount` beats.
    pub fn shifted(self, amount: f64) -> Self {
        let beatmap = self.beatmap.shift(amount);
        Self { beatmap, ..self }
    }

    /// Copy out the audio from the start of `start_beat` up to `end_beat`
    /// (1-indexed, fractional allowed).
    pub fn slice_beats(&self, start_beat: f64, end_beat: f64) -> Option<AudioSource> {
        let (start, end) = self.beatmap.slice(start_beat, end_beat)?;
        Some(AudioSource::from_segment(
            self.audio.window(start, end),
            self.audio.sample_rate(),
        ))
    }

    /// Resample audio and boundaries together to `target_rate`.
    pub fn resampled(&self, target_rate: u32) -> Result<Self> {
        let audio = self.audio.resampled(target_rate)?;
        let ratio = target_rate as f64 / self.audio.sample_rate() as f64;
        let beatmap = self.beatmap.resampled(ratio, audio.len());
        Ok(Self { audio, beatmap })
    }
}
