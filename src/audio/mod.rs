//! Audio data — immutable multi-channel sources and the mutable segments cut from them.
//!
//! Samples are stored channel-major (`channels[c][frame]`). An [`AudioSource`] is
//! validated once at construction and never mutated afterwards; rendering works
//! on owned [`Segment`]s extracted from it.

pub mod limiter;
pub mod resample;

pub use limiter::Limiter;
pub use resample::{resample_by_ratio, resample_linear};

use crate::error::{BeatswapError, Result};

/// An owned, channel-major window of samples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Segment {
    channels: Vec<Vec<f32>>,
}

impl Segment {
    /// Wrap channel-major data. Channels are expected to share one length.
    pub fn new(channels: Vec<Vec<f32>>) -> Self {
        Self { channels }
    }

    /// A segment of `frames` zero samples on each of `channel_count` channels.
    pub fn silent(channel_count: usize, frames: usize) -> Self {
        Self {
            channels: vec![vec![0.0; frames]; channel_count],
        }
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    pub fn channels_mut(&mut self) -> &mut [Vec<f32>] {
        &mut self.channels
    }

    pub fn into_channels(self) -> Vec<Vec<f32>> {
        self.channels
    }

    /// Append `other` in time. An empty `self` adopts `other`'s channel layout.
    pub fn append(&mut self, other: Segment) {
        if self.channels.is_empty() {
            self.channels = other.channels;
            return;
        }
        for (dst, src) in self.channels.iter_mut().zip(other.channels) {
            dst.extend(src);
        }
    }

    /// Pad every channel with `value` up to `frames`.
    pub fn pad_to(&mut self, frames: usize, value: f32) {
        for channel in &mut self.channels {
            if channel.len() < frames {
                channel.resize(frames, value);
            }
        }
    }

    /// Map this segment onto `channel_count` channels.
    ///
    /// Mono input is duplicated; otherwise output channel `c` reads input
    /// channel `c % input_channels`.
    pub fn conform(self, channel_count: usize) -> Segment {
        if self.channels.len() == channel_count || self.channels.is_empty() {
            return self;
        }
        let source = self.channels;
        let channels = (0..channel_count)
            .map(|c| source[c % source.len()].clone())
            .collect();
        Segment { channels }
    }
}

/// An immutable multi-channel sample buffer at a known sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSource {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl AudioSource {
    /// Create a source from channel-major samples.
    ///
    /// Fails with [`BeatswapError::InvalidAudio`] when there are no channels,
    /// channel lengths differ, the sample rate is zero or a sample is not finite.
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        if channels.is_empty() {
            return Err(BeatswapError::invalid_audio("audio has no channels"));
        }
        if sample_rate == 0 {
            return Err(BeatswapError::invalid_audio("sample rate must be positive"));
        }
        let len = channels[0].len();
        if let Some(c) = channels.iter().position(|ch| ch.len() != len) {
            return Err(BeatswapError::invalid_audio(format!(
                "channel {c} has {} samples, expected {len}",
                channels[c].len()
            )));
        }
        if channels.iter().flatten().any(|s| !s.is_finite()) {
            return Err(BeatswapError::invalid_audio("audio contains NaN or infinite samples"));
        }
        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Create a single-channel source.
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        Self::new(vec![samples], sample_rate)
    }

    /// Create a source from interleaved frames, as codecs usually deliver them.
    pub fn from_interleaved(samples: &[f32], channel_count: usize, sample_rate: u32) -> Result<Self> {
        if channel_count == 0 {
            return Err(BeatswapError::invalid_audio("audio has no channels"));
        }
        if samples.len() % channel_count != 0 {
            return Err(BeatswapError::invalid_audio(format!(
                "{} interleaved samples do not divide into {channel_count} channels",
                samples.len()
            )));
        }
        let mut channels = vec![Vec::with_capacity(samples.len() / channel_count); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (channel, &s) in channels.iter_mut().zip(frame) {
                channel.push(s);
            }
        }
        Self::new(channels, sample_rate)
    }

    pub(crate) fn from_segment(segment: Segment, sample_rate: u32) -> Self {
        Self {
            channels: segment.into_channels(),
            sample_rate,
        }
    }

    /// Interleave the channels back into frames.
    pub fn to_interleaved(&self) -> Vec<f32> {
        let channel_count = self.channels.len();
        let mut out = Vec::with_capacity(self.len() * channel_count);
        for frame in 0..self.len() {
            for channel in &self.channels {
                out.push(channel[frame]);
            }
        }
        out
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn duration_secs(&self) -> f64 {
        self.len() as f64 / self.sample_rate as f64
    }

    /// Copy out the frames in `start..end`, clamped to the source length.
    pub fn window(&self, start: usize, end: usize) -> Segment {
        let end = end.min(self.len());
        let start = start.min(end);
        Segment::new(
            self.channels
                .iter()
                .map(|ch| ch[start..end].to_vec())
                .collect(),
        )
    }

    /// Linear-interpolation resample of every channel to `target_rate`.
    pub fn resampled(&self, target_rate: u32) -> Result<Self> {
        if target_rate == 0 {
            return Err(BeatswapError::invalid_audio("sample rate must be positive"));
        }
        if target_rate == self.sample_rate {
            return Ok(self.clone());
        }
        let channels = self
            .channels
            .iter()
            .map(|ch| resample_linear(ch, self.sample_rate, target_rate))
            .collect();
        Ok(Self {
            channels,
            sample_rate: target_rate,
        })
    }
}
