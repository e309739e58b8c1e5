//! Per-segment effects addressed by one-letter codes in pattern text.
//!
//! | code | effect      | parameter (default)                         |
//! |------|-------------|---------------------------------------------|
//! | `s`  | speed       | factor ≥ 1/64 (2); resamples, pitch moves   |
//! | `r`  | reverse     | none                                        |
//! | `v`  | volume      | gain (0.5)                                  |
//! | `d`  | downsample  | hold factor ≥ 1 (8)                         |
//! | `b`  | bitcrush    | bit depth 1..=24 (4)                        |
//! | `g`  | gradient    | difference passes 1..=8 (1)                 |
//! | `c`  | channel     | none = swap L/R, `0`/`1` = keep one side    |
//!
//! Effects run in the order they were written; only speed changes the
//! segment length and none change its channel count.

use std::fmt;

use thiserror::Error;

use crate::audio::{resample_by_ratio, Segment};

/// Slowest accepted speed factor; each factor stretches a segment at most 64x.
pub const MIN_SPEED: f64 = 1.0 / 64.0;

/// Errors raised when turning a code and parameter into an [`Effect`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EffectError {
    #[error("unknown effect '{0}'")]
    Unknown(char),
    #[error("effect '{code}': {reason}")]
    InvalidParam { code: char, reason: String },
}

/// Channel routing applied by the `c` effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOp {
    /// Swap the first two channels.
    Swap,
    /// Keep one channel and silence the others.
    Isolate(usize),
}

/// A single segment transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    Speed(f64),
    Reverse,
    Volume(f32),
    Downsample(usize),
    Bitcrush(u32),
    Gradient(u32),
    Channel(ChannelOp),
}

impl Effect {
    /// Every recognised effect code.
    pub const CODES: [char; 7] = ['s', 'r', 'v', 'd', 'b', 'g', 'c'];

    /// Build an effect from its pattern code and optional numeric parameter.
    pub fn from_code(code: char, param: Option<f64>) -> Result<Self, EffectError> {
        let invalid = |reason: &str| EffectError::InvalidParam {
            code,
            reason: reason.to_string(),
        };
        if param.is_some_and(|p| !p.is_finite()) {
            return Err(invalid("parameter must be a finite number"));
        }
        match code {
            's' => {
                let factor = param.unwrap_or(2.0);
                if factor < MIN_SPEED {
                    return Err(invalid("speed factor must be at least 1/64"));
                }
                Ok(Effect::Speed(factor))
            }
            'r' => match param {
                None => Ok(Effect::Reverse),
                Some(_) => Err(invalid("reverse takes no parameter")),
            },
            'v' => Ok(Effect::Volume(param.unwrap_or(0.5) as f32)),
            'd' => {
                let factor = param.unwrap_or(8.0).round();
                if factor < 1.0 {
                    return Err(invalid("downsample factor must be at least 1"));
                }
                Ok(Effect::Downsample(factor as usize))
            }
            'b' => {
                let depth = param.unwrap_or(4.0).round();
                if !(1.0..=24.0).contains(&depth) {
                    return Err(invalid("bit depth must be between 1 and 24"));
                }
                Ok(Effect::Bitcrush(depth as u32))
            }
            'g' => {
                let passes = param.unwrap_or(1.0).round();
                if !(1.0..=8.0).contains(&passes) {
                    return Err(invalid("gradient passes must be between 1 and 8"));
                }
                Ok(Effect::Gradient(passes as u32))
            }
            'c' => match param {
                None => Ok(Effect::Channel(ChannelOp::Swap)),
                Some(p) if p == 0.0 || p == 1.0 => Ok(Effect::Channel(ChannelOp::Isolate(p as usize))),
                Some(_) => Err(invalid("channel must be 0 (left) or 1 (right)")),
            },
            other => Err(EffectError::Unknown(other)),
        }
    }

    pub fn code(&self) -> char {
        match self {
            Effect::Speed(_) => 's',
            Effect::Reverse => 'r',
            Effect::Volume(_) => 'v',
            Effect::Downsample(_) => 'd',
            Effect::Bitcrush(_) => 'b',
            Effect::Gradient(_) => 'g',
            Effect::Channel(_) => 'c',
        }
    }

    /// The parameter as it would be written in pattern text.
    pub fn param(&self) -> Option<f64> {
        match *self {
            Effect::Speed(f) => Some(f),
            Effect::Reverse => None,
            Effect::Volume(g) => Some(g as f64),
            Effect::Downsample(n) => Some(n as f64),
            Effect::Bitcrush(d) => Some(d as f64),
            Effect::Gradient(p) => Some(p as f64),
            Effect::Channel(ChannelOp::Swap) => None,
            Effect::Channel(ChannelOp::Isolate(c)) => Some(c as f64),
        }
    }

    /// Transform a segment.
    pub fn apply(&self, mut segment: Segment) -> Segment {
        match *self {
            Effect::Speed(factor) => {
                if factor == 1.0 {
                    return segment;
                }
                Segment::new(
                    segment
                        .channels()
                        .iter()
                        .map(|ch| resample_by_ratio(ch, factor))
                        .collect(),
                )
            }
            Effect::Reverse => {
                for ch in segment.channels_mut() {
                    ch.reverse();
                }
                segment
            }
            Effect::Volume(gain) => {
                for s in segment.channels_mut().iter_mut().flatten() {
                    *s *= gain;
                }
                segment
            }
            Effect::Downsample(factor) => {
                for ch in segment.channels_mut() {
                    sample_and_hold(ch, factor);
                }
                segment
            }
            Effect::Bitcrush(depth) => {
                let half = (1u32 << (depth - 1)) as f32;
                for s in segment.channels_mut().iter_mut().flatten() {
                    *s = (*s * half).round() / half;
                }
                segment
            }
            Effect::Gradient(passes) => {
                for ch in segment.channels_mut() {
                    for _ in 0..passes {
                        first_difference(ch);
                    }
                }
                segment
            }
            Effect::Channel(ChannelOp::Swap) => {
                if segment.channel_count() >= 2 {
                    segment.channels_mut().swap(0, 1);
                }
                segment
            }
            Effect::Channel(ChannelOp::Isolate(keep)) => {
                for (c, ch) in segment.channels_mut().iter_mut().enumerate() {
                    if c != keep {
                        ch.iter_mut().for_each(|s| *s = 0.0);
                    }
                }
                segment
            }
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.param() {
            Some(p) => write!(f, "{}{}", self.code(), p),
            None => write!(f, "{}", self.code()),
        }
    }
}

/// Apply `effects` left to right.
pub fn apply_chain(effects: &[Effect], segment: Segment) -> Segment {
    effects.iter().fold(segment, |seg, effect| effect.apply(seg))
}

/// Hold every `factor`-th sample over the following `factor - 1` samples.
fn sample_and_hold(channel: &mut [f32], factor: usize) {
    if factor <= 1 {
        return;
    }
    for block in channel.chunks_mut(factor) {
        let held = block[0];
        block.iter_mut().for_each(|s| *s = held);
    }
}

/// `y[t] = x[t] - x[t-1]`, with the first sample differenced against itself.
fn first_difference(channel: &mut [f32]) {
    let Some(&first) = channel.first() else {
        return;
    };
    let mut prev = first;
    for s in channel.iter_mut() {
        let current = *s;
        *s = current - prev;
        prev = current;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stereo(left: &[f32], right: &[f32]) -> Segment {
        Segment::new(vec![left.to_vec(), right.to_vec()])
    }

    #[test]
    fn from_code_defaults() {
        assert_eq!(Effect::from_code('s', None).unwrap(), Effect::Speed(2.0));
        assert_eq!(Effect::from_code('v', None).unwrap(), Effect::Volume(0.5));
        assert_eq!(Effect::from_code('d', None).unwrap(), Effect::Downsample(8));
        assert_eq!(Effect::from_code('b', None).unwrap(), Effect::Bitcrush(4));
        assert_eq!(Effect::from_code('g', None).unwrap(), Effect::Gradient(1));
        assert_eq!(
            Effect::from_code('c', None).unwrap(),
            Effect::Channel(ChannelOp::Swap)
        );
    }

    #[test]
    fn from_code_rejects_unknown() {
        assert_eq!(Effect::from_code('x', None), Err(EffectError::Unknown('x')));
    }

    #[test]
    fn from_code_rejects_bad_params() {
        assert!(Effect::from_code('s', Some(0.0)).is_err());
        assert!(Effect::from_code('r', Some(2.0)).is_err());
        assert!(Effect::from_code('d', Some(0.0)).is_err());
        assert!(Effect::from_code('b', Some(32.0)).is_err());
        assert!(Effect::from_code('c', Some(2.0)).is_err());
    }

    #[test]
    fn from_code_bounds_speed() {
        assert!(matches!(
            Effect::from_code('s', Some(0.000_000_001)),
            Err(EffectError::InvalidParam { code: 's', .. })
        ));
        assert!(Effect::from_code('s', Some(MIN_SPEED / 2.0)).is_err());
        assert_eq!(
            Effect::from_code('s', Some(MIN_SPEED)).unwrap(),
            Effect::Speed(MIN_SPEED)
        );
    }

    #[test]
    fn slowest_speed_stretches_by_bounded_factor() {
        let seg = Segment::new(vec![vec![0.0; 10]]);
        assert_eq!(Effect::Speed(MIN_SPEED).apply(seg).frames(), 640);
    }

    #[test]
    fn every_code_round_trips() {
        for code in Effect::CODES {
            let effect = Effect::from_code(code, None).unwrap();
            assert_eq!(effect.code(), code);
            assert_eq!(Effect::from_code(code, effect.param()).unwrap(), effect);
        }
    }

    #[test]
    fn speed_two_halves_length() {
        let seg = stereo(&[0.0; 100], &[0.0; 100]);
        let out = Effect::Speed(2.0).apply(seg);
        assert_eq!(out.frames(), 50);
        assert_eq!(out.channel_count(), 2);
    }

    #[test]
    fn speed_half_doubles_length() {
        let seg = Segment::new(vec![vec![0.0; 10]]);
        assert_eq!(Effect::Speed(0.5).apply(seg).frames(), 20);
    }

    #[test]
    fn reverse_flips_each_channel() {
        let out = Effect::Reverse.apply(stereo(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]));
        assert_eq!(out.channels(), &[vec![3.0, 2.0, 1.0], vec![6.0, 5.0, 4.0]]);
    }

    #[test]
    fn volume_scales() {
        let out = Effect::Volume(0.5).apply(Segment::new(vec![vec![0.5, -1.0]]));
        assert_eq!(out.channels()[0], vec![0.25, -0.5]);
    }

    #[test]
    fn downsample_holds_samples() {
        let out = Effect::Downsample(3).apply(Segment::new(vec![vec![1.0, 2.0, 3.0, 4.0, 5.0]]));
        assert_eq!(out.channels()[0], vec![1.0, 1.0, 1.0, 4.0, 4.0]);
    }

    #[test]
    fn bitcrush_quantizes() {
        let out = Effect::Bitcrush(2).apply(Segment::new(vec![vec![0.3, 0.8, -0.6]]));
        // 2 bits: steps of 0.5
        assert_eq!(out.channels()[0], vec![0.5, 1.0, -0.5]);
    }

    #[test]
    fn gradient_removes_dc() {
        let out = Effect::Gradient(1).apply(Segment::new(vec![vec![0.5; 6]]));
        assert!(out.channels()[0].iter().all(|&s| s == 0.0));
        let ramp = Effect::Gradient(1).apply(Segment::new(vec![vec![0.0, 0.1, 0.3]]));
        assert_eq!(ramp.frames(), 3);
        assert!((ramp.channels()[0][2] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn channel_swap_and_isolate() {
        let swapped = Effect::Channel(ChannelOp::Swap).apply(stereo(&[1.0], &[2.0]));
        assert_eq!(swapped.channels(), &[vec![2.0], vec![1.0]]);

        let left = Effect::Channel(ChannelOp::Isolate(0)).apply(stereo(&[1.0], &[2.0]));
        assert_eq!(left.channels(), &[vec![1.0], vec![0.0]]);

        let right = Effect::Channel(ChannelOp::Isolate(1)).apply(stereo(&[1.0], &[2.0]));
        assert_eq!(right.channels(), &[vec![0.0], vec![2.0]]);
    }

    #[test]
    fn swap_on_mono_is_noop() {
        let seg = Segment::new(vec![vec![0.3, 0.4]]);
        assert_eq!(Effect::Channel(ChannelOp::Swap).apply(seg.clone()), seg);
    }

    #[test]
    fn chain_order_matters() {
        let seg = Segment::new(vec![(0..8).map(|i| i as f32).collect()]);
        let speed_then_reverse = apply_chain(&[Effect::Speed(2.0), Effect::Reverse], seg.clone());
        let reverse_then_speed = apply_chain(&[Effect::Reverse, Effect::Speed(2.0)], seg);
        assert_eq!(speed_then_reverse.channels()[0], vec![6.0, 4.0, 2.0, 0.0]);
        assert_eq!(reverse_then_speed.channels()[0], vec![7.0, 5.0, 3.0, 1.0]);
    }

    #[test]
    fn display_uses_pattern_syntax() {
        assert_eq!(Effect::Speed(2.0).to_string(), "s2");
        assert_eq!(Effect::Volume(0.5).to_string(), "v0.5");
        assert_eq!(Effect::Reverse.to_string(), "r");
        assert_eq!(Effect::Channel(ChannelOp::Swap).to_string(), "c");
    }
}
