//! Beatmaps — ordered beat boundaries over an audio source, with scale and shift.
//!
//! Boundaries are sample indices. Beat `n` (1-indexed) spans
//! `boundaries[n - 1]..boundaries[n]`. Fractional beat coordinates are resolved by
//! linear interpolation between neighbouring boundaries.
//!
//! [`Beatmap::build`] validates detector output strictly. The transforms
//! ([`Beatmap::scale`], [`Beatmap::shift`]) never fail: boundaries that would land
//! outside the source are dropped, which can leave fewer beats than before.

pub mod song;

pub use song::Song;

use tracing::warn;

use crate::error::{BeatswapError, Result};

/// Scale factors below this are clamped up to it.
pub const MIN_SCALE: f64 = 0.02;

/// Ordered, strictly increasing beat boundaries within `[0, source_len]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Beatmap {
    boundaries: Vec<usize>,
    source_len: usize,
}

impl Beatmap {
    /// Validate detector boundaries against the length of their source.
    ///
    /// Needs at least two boundaries, strictly increasing, none past `source_len`.
    pub fn build(boundaries: impl Into<Vec<usize>>, source_len: usize) -> Result<Self> {
        let boundaries = boundaries.into();
        if boundaries.len() < 2 {
            return Err(BeatswapError::invalid_beatmap(format!(
                "need at least 2 boundaries, got {}",
                boundaries.len()
            )));
        }
        if let Some(w) = boundaries.windows(2).position(|w| w[1] <= w[0]) {
            return Err(BeatswapError::invalid_beatmap(format!(
                "boundary {} ({}) does not follow boundary {} ({})",
                w + 1,
                boundaries[w + 1],
                w,
                boundaries[w]
            )));
        }
        if let Some(&last) = boundaries.last() {
            if last > source_len {
                return Err(BeatswapError::invalid_beatmap(format!(
                    "boundary {last} lies past the end of a {source_len}-sample source"
                )));
            }
        }
        Ok(Self {
            boundaries,
            source_len,
        })
    }

    /// Build from beat times in seconds.
    pub fn from_seconds(times: &[f64], sample_rate: u32, source_len: usize) -> Result<Self> {
        let boundaries = times
            .iter()
            .map(|&t| {
                if t.is_finite() && t >= 0.0 {
                    Ok((t * sample_rate as f64).round() as usize)
                } else {
                    Err(BeatswapError::invalid_beatmap(format!("invalid beat time: {t}")))
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Self::build(boundaries, source_len)
    }

    pub fn boundaries(&self) -> &[usize] {
        &self.boundaries
    }

    /// Length in samples of the source this map was derived from.
    pub fn source_len(&self) -> usize {
        self.source_len
    }

    pub fn beat_count(&self) -> usize {
        self.boundaries.len().saturating_sub(1)
    }

    /// Length in samples of 1-indexed beat `beat`.
    pub fn beat_len(&self, beat: usize) -> Option<usize> {
        if beat == 0 || beat > self.beat_count() {
            return None;
        }
        Some(self.boundaries[beat] - self.boundaries[beat - 1])
    }

    /// Mean distance between consecutive boundaries.
    pub fn mean_interval(&self) -> Option<f64> {
        let (first, last) = (self.boundaries.first()?, self.boundaries.last()?);
        match self.beat_count() {
            0 => None,
            n => Some((last - first) as f64 / n as f64),
        }
    }

    /// Tempo implied by the mean beat interval.
    pub fn estimated_bpm(&self, sample_rate: u32) -> Option<f64> {
        let interval = self.mean_interval()?;
        if interval <= 0.0 {
            return None;
        }
        Some(60.0 * sample_rate as f64 / interval)
    }

    /// Sample position of boundary coordinate `index`, clamped to the mapped span.
    ///
    /// Integer coordinates are boundaries; `1.5` lies halfway between
    /// boundaries 1 and 2.
    pub fn position(&self, index: f64) -> f64 {
        let max = self.boundaries.len().saturating_sub(1) as f64;
        self.extrapolate(index.clamp(0.0, max))
    }

    /// Like [`position`](Self::position), but extends the first and last
    /// intervals past either end instead of clamping.
    fn extrapolate(&self, index: f64) -> f64 {
        let b = &self.boundaries;
        match b.len() {
            0 => 0.0,
            1 => b[0] as f64,
            n => {
                let last = n - 1;
                if index <= 0.0 {
                    b[0] as f64 + index * (b[1] - b[0]) as f64
                } else if index >= last as f64 {
                    b[last] as f64 + (index - last as f64) * (b[last] - b[last - 1]) as f64
                } else {
                    let i = index.floor() as usize;
                    let frac = index - i as f64;
                    b[i] as f64 + frac * (b[i + 1] - b[i]) as f64
                }
            }
        }
    }

    /// Whether 1-indexed (possibly fractional) `beat` starts inside the map.
    pub fn contains_beat(&self, beat: f64) -> bool {
        beat.is_finite() && beat >= 1.0 && beat - 1.0 < self.beat_count() as f64
    }

    /// Sample window of 1-indexed `beat`. A fractional beat starts between
    /// boundaries and keeps a one-beat span, truncated at the last boundary.
    pub fn window(&self, beat: f64) -> Option<(usize, usize)> {
        if !self.contains_beat(beat) {
            return None;
        }
        let start = self.position(beat - 1.0).round() as usize;
        let end = self.position(beat).round() as usize;
        Some((start, end.max(start)))
    }

    /// Sample range from the start of `start_beat` up to `end_beat`, both
    /// 1-indexed: `slice(4.0, 4.5)` is the first half of beat 4.
    pub fn slice(&self, start_beat: f64, end_beat: f64) -> Option<(usize, usize)> {
        if !self.contains_beat(start_beat) || !(end_beat > start_beat) {
            return None;
        }
        let start = self.position(start_beat - 1.0).round() as usize;
        let end = self.position(end_beat - 1.0).round() as usize;
        Some((start, end.max(start)))
    }

    /// Resample the boundary spacing by `factor`.
    ///
    /// `factor > 1` produces more, shorter beats; `factor < 1` fewer, longer
    /// ones. The first boundary is kept. Negative factors act as their absolute
    /// value and anything below [`MIN_SCALE`] is clamped up to it.
    pub fn scale(&self, factor: f64) -> Beatmap {
        let factor = if factor.is_finite() {
            factor.abs().max(MIN_SCALE)
        } else {
            1.0
        };
        let beats = self.beat_count() as f64;
        let span = match (self.boundaries.first(), self.boundaries.last()) {
            (Some(first), Some(last)) => last - first,
            _ => return self.clone(),
        };
        // No interval may shrink below one sample.
        let uncapped = (beats * factor + 1e-9).floor() as usize;
        let total = uncapped.min(span);
        let step = if total == uncapped {
            1.0 / factor
        } else {
            beats / total.max(1) as f64
        };
        let positions = (0..=total).map(|k| self.position(k as f64 * step));
        Self::from_positions(positions, self.source_len)
    }

    /// Move which boundary counts as the first by `amount` beats.
    ///
    /// Fractional amounts interpolate between boundaries. Boundaries pushed past
    /// either end of the source are dropped, truncating the beat count.
    pub fn shift(&self, amount: f64) -> Beatmap {
        if !amount.is_finite() || amount == 0.0 {
            return self.clone();
        }
        let positions = (0..self.boundaries.len()).map(|k| self.extrapolate(k as f64 + amount));
        let shifted = Self::from_positions(positions, self.source_len);
        if shifted.beat_count() < self.beat_count() {
            warn!(
                amount,
                before = self.beat_count(),
                after = shifted.beat_count(),
                "beatmap shift truncated the beat count"
            );
        }
        shifted
    }

    /// Rescale boundary positions for a source resampled by `ratio`
    /// (target rate / source rate) to `source_len` samples.
    pub(crate) fn resampled(&self, ratio: f64, source_len: usize) -> Beatmap {
        let positions = self.boundaries.iter().map(|&b| b as f64 * ratio);
        Self::from_positions(positions, source_len)
    }

    /// Round positions to samples, dropping any outside the source or not
    /// strictly after the previous boundary.
    fn from_positions(positions: impl Iterator<Item = f64>, source_len: usize) -> Beatmap {
        let mut boundaries: Vec<usize> = Vec::new();
        for p in positions {
            if !p.is_finite() || p < -0.5 || p > source_len as f64 + 0.5 {
                continue;
            }
            let sample = (p.round().max(0.0) as usize).min(source_len);
            if boundaries.last().map_or(true, |&prev| sample > prev) {
                boundaries.push(sample);
            }
        }
        Beatmap {
            boundaries,
            source_len,
        }
    }
}
