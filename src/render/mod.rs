//! Renderer — interprets a compiled [`Pattern`] against beatmapped audio.
//!
//! A render runs in two phases. [`RenderContext::plan`] walks the pattern
//! sequentially and settles shuffle order, the position variable, random draws
//! and wraparound. The resulting plans are then executed independently (across
//! a rayon pool with the `parallel` feature), concatenated, and clipped.
//! Either phase failing aborts the render; partial output is never returned.

pub mod context;
pub mod sources;

pub use context::{Plan, RenderContext};
pub use sources::SourceTable;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::audio::{AudioSource, Limiter, Segment};
use crate::beatmap::Song;
use crate::effect::apply_chain;
use crate::error::Result;
use crate::pattern::{MixMode, Pattern};

/// How many times the pattern plays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Repeat {
    /// One pass over the pattern.
    #[default]
    Once,
    /// Tile the pattern across the whole primary beatmap.
    Fill,
}

/// Per-render settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    /// RNG seed; `None` draws one from system entropy.
    pub seed: Option<u64>,
    pub repeat: Repeat,
    /// Output and mix clip level, clamped into `(0, 1]`.
    pub ceiling: f32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            seed: None,
            repeat: Repeat::Once,
            ceiling: 1.0,
        }
    }
}

impl RenderOptions {
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    pub fn with_repeat(self, repeat: Repeat) -> Self {
        Self { repeat, ..self }
    }
}

/// Render `pattern` against `song`, resolving `[alias]` references in `sources`.
///
/// The output has the primary song's sample rate and channel count.
pub fn render(
    pattern: &Pattern,
    song: &Song,
    sources: &SourceTable,
    options: RenderOptions,
) -> Result<AudioSource> {
    for alias in pattern.aliases() {
        let secondary = sources.resolve(alias)?;
        if secondary.sample_rate() != song.sample_rate() {
            warn!(
                alias,
                primary = song.sample_rate(),
                secondary = secondary.sample_rate(),
                "secondary source sample rate differs from the primary"
            );
        }
    }

    let seed = options.seed.unwrap_or_else(rand::random);
    debug!(
        seed,
        repeat = ?options.repeat,
        steps = pattern.steps().len(),
        "render started"
    );

    let mut ctx = RenderContext::new(song, sources, seed, options.repeat);
    let plans = ctx.plan(pattern)?;

    let channels = song.audio().channel_count();
    let limiter = Limiter::new(options.ceiling);
    let mut output = Segment::silent(channels, 0);
    for segment in execute_all(&plans, channels, &limiter) {
        output.append(segment);
    }
    limiter.process_segment(&mut output);

    debug!(
        frames = output.frames(),
        channels,
        ceiling = limiter.ceiling(),
        "render finished"
    );
    Ok(AudioSource::from_segment(output, song.sample_rate()))
}

#[cfg(not(feature = "parallel"))]
fn execute_all(plans: &[Plan<'_>], channels: usize, limiter: &Limiter) -> Vec<Segment> {
    plans
        .iter()
        .map(|plan| execute(plan, channels, limiter))
        .collect()
}

#[cfg(feature = "parallel")]
fn execute_all(plans: &[Plan<'_>], channels: usize, limiter: &Limiter) -> Vec<Segment> {
    use rayon::prelude::*;

    plans
        .par_iter()
        .map(|plan| execute(plan, channels, limiter))
        .collect()
}

fn execute(plan: &Plan<'_>, channels: usize, limiter: &Limiter) -> Segment {
    match plan {
        Plan::Extract {
            audio,
            start,
            end,
            effects,
        } => apply_chain(effects, audio.window(*start, *end)).conform(channels),
        Plan::Silence { frames } => Segment::silent(channels, *frames),
        Plan::Mix { mode, parts } => {
            let parts = parts
                .iter()
                .map(|part| execute(part, channels, limiter))
                .collect();
            let mut mixed = mix(*mode, parts, channels);
            limiter.process_segment(&mut mixed);
            mixed
        }
    }
}

/// Combine parts sample-wise over the longest part's duration.
fn mix(mode: MixMode, parts: Vec<Segment>, channels: usize) -> Segment {
    let frames = parts.iter().map(Segment::frames).max().unwrap_or(0);
    let identity = match mode {
        MixMode::Sum => 0.0,
        MixMode::Product => 1.0,
    };
    let mut out = Segment::new(vec![vec![identity; frames]; channels]);
    for mut part in parts {
        part.pad_to(frames, identity);
        for (acc, src) in out.channels_mut().iter_mut().zip(part.channels()) {
            for (a, &b) in acc.iter_mut().zip(src) {
                match mode {
                    MixMode::Sum => *a += b,
                    MixMode::Product => *a *= b,
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::Effect;
    use crate::pattern::compile;
    use assert_approx_eq::assert_approx_eq;

    /// Four beats of 10 frames at levels 0.1, 0.2, 0.3, 0.4.
    fn stepped_song() -> Song {
        let samples: Vec<f32> = (0..40).map(|i| (i / 10 + 1) as f32 / 10.0).collect();
        let audio = AudioSource::mono(samples, 100).unwrap();
        Song::from_boundaries(audio, vec![0, 10, 20, 30, 40]).unwrap()
    }

    fn render_text(text: &str, song: &Song) -> AudioSource {
        render(&compile(text).unwrap(), song, &SourceTable::new(), RenderOptions::seeded(7)).unwrap()
    }

    #[test]
    fn mix_sums_and_pads_with_zero() {
        let parts = vec![
            Segment::new(vec![vec![0.25, 0.25, 0.25]]),
            Segment::new(vec![vec![0.5]]),
        ];
        let out = mix(MixMode::Sum, parts, 1);
        assert_eq!(out.channels()[0], vec![0.75, 0.25, 0.25]);
    }

    #[test]
    fn mix_product_pads_with_one() {
        let parts = vec![
            Segment::new(vec![vec![0.5, 0.5, 0.5]]),
            Segment::new(vec![vec![0.5]]),
        ];
        let out = mix(MixMode::Product, parts, 1);
        assert_eq!(out.channels()[0], vec![0.25, 0.5, 0.5]);
    }

    #[test]
    fn execute_runs_effects_before_conforming() {
        let audio = AudioSource::mono(vec![0.1, 0.2, 0.3, 0.4], 100).unwrap();
        let effects = [Effect::Reverse];
        let plan = Plan::Extract {
            audio: &audio,
            start: 1,
            end: 4,
            effects: &effects,
        };
        let seg = execute(&plan, 2, &Limiter::default());
        assert_eq!(seg.channel_count(), 2);
        assert_eq!(seg.channels()[0], vec![0.4, 0.3, 0.2]);
        assert_eq!(seg.channels()[1], vec![0.4, 0.3, 0.2]);
    }

    #[test]
    fn render_reorders_beats() {
        let out = render_text("4,1", &stepped_song());
        assert_eq!(out.len(), 20);
        assert_approx_eq!(out.channel(0).unwrap()[0], 0.4);
        assert_approx_eq!(out.channel(0).unwrap()[10], 0.1);
    }

    #[test]
    fn render_applies_effects() {
        let out = render_text("2s2,3v0.5", &stepped_song());
        assert_eq!(out.len(), 15);
        assert_approx_eq!(out.channel(0).unwrap()[7], 0.15);
    }

    #[test]
    fn render_slices_before_skipping() {
        let out = render_text("1>0.5!,2<0.3", &stepped_song());
        assert_eq!(out.len(), 8);
        assert!(out.channel(0).unwrap()[..5].iter().all(|&s| s == 0.0));
        assert_approx_eq!(out.channel(0).unwrap()[5], 0.2);
    }

    #[test]
    fn render_clips_to_ceiling() {
        let song = stepped_song();
        let options = RenderOptions {
            ceiling: 0.25,
            ..RenderOptions::seeded(1)
        };
        let out = render(&compile("4;3").unwrap(), &song, &SourceTable::new(), options).unwrap();
        assert!(out.channel(0).unwrap().iter().all(|&s| s <= 0.25));
    }

    #[test]
    fn render_empty_after_fill_drop_keeps_channels() {
        let song = stepped_song();
        let options = RenderOptions::seeded(1).with_repeat(Repeat::Fill);
        let out = render(&compile("9").unwrap(), &song, &SourceTable::new(), options).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.channel_count(), 1);
        assert_eq!(out.sample_rate(), 100);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn parallel_execution_matches_sequential() {
        let song = stepped_song();
        let table = SourceTable::new();
        let pattern = compile("@1_4#a,2r#a,3;4v0.5,i^2,1s2#a").unwrap();
        let limiter = Limiter::new(0.9);

        for seed in 0..8 {
            let mut ctx = RenderContext::new(&song, &table, seed, Repeat::Once);
            let plans = ctx.plan(&pattern).unwrap();
            let sequential: Vec<Segment> = plans.iter().map(|p| execute(p, 1, &limiter)).collect();
            assert_eq!(execute_all(&plans, 1, &limiter), sequential);

            let options = RenderOptions {
                ceiling: 0.9,
                ..RenderOptions::seeded(seed)
            };
            let out = render(&pattern, &song, &table, options).unwrap();
            let mut expected = Segment::silent(1, 0);
            for segment in sequential {
                expected.append(segment);
            }
            limiter.process_segment(&mut expected);
            assert_eq!(out, AudioSource::from_segment(expected, song.sample_rate()));
        }
    }

    #[test]
    fn options_defaults() {
        let opts = RenderOptions::default();
        assert_eq!(opts.seed, None);
        assert_eq!(opts.repeat, Repeat::Once);
        assert_eq!(opts.ceiling, 1.0);
    }
}
