//! Per-render state and the sequential planning pass.
//!
//! Planning walks the pattern once, in playback order, and settles everything
//! that depends on shared state: shuffle permutations, the position variable,
//! random draws and beat wraparound. The resulting [`Plan`] list holds only
//! sample ranges and effect chains, so it can be executed in any order.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::trace;

use crate::audio::AudioSource;
use crate::beatmap::{Beatmap, Song};
use crate::effect::Effect;
use crate::error::{BeatswapError, Result};
use crate::pattern::{level_size, BeatRef, BeatToken, MixMode, Node, Pattern, Slice};

use super::{Repeat, SourceTable};

/// One planned output segment.
#[derive(Debug, Clone, PartialEq)]
pub enum Plan<'a> {
    /// Cut `start..end` from `audio` and run `effects` over it.
    Extract {
        audio: &'a AudioSource,
        start: usize,
        end: usize,
        effects: &'a [Effect],
    },
    /// Silence of a skipped beat.
    Silence { frames: usize },
    /// Parts rendered over the same span and combined.
    Mix { mode: MixMode, parts: Vec<Plan<'a>> },
}

/// Where a node's beat references resolve.
#[derive(Clone, Copy)]
struct Scope<'a> {
    song: &'a Song,
    alias: Option<&'a str>,
    /// Sized-sibling count of the current nesting level.
    level_len: usize,
    /// Added to literal and random references (tiling).
    offset: f64,
}

/// State for a single render call.
pub struct RenderContext<'a> {
    primary: &'a Song,
    sources: &'a SourceTable,
    rng: ChaCha8Rng,
    position: usize,
    repeat: Repeat,
}

impl<'a> RenderContext<'a> {
    pub fn new(primary: &'a Song, sources: &'a SourceTable, seed: u64, repeat: Repeat) -> Self {
        Self {
            primary,
            sources,
            rng: ChaCha8Rng::seed_from_u64(seed),
            position: 0,
            repeat,
        }
    }

    /// The position variable: 0-based index of the current top-level step.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Plan every step of `pattern` in playback order.
    pub fn plan(&mut self, pattern: &'a Pattern) -> Result<Vec<Plan<'a>>> {
        let order = self.shuffle_order(pattern);
        let size = pattern.size();
        let iterations = match self.repeat {
            Repeat::Once => 1,
            Repeat::Fill if size == 0 => 1,
            Repeat::Fill => self.primary.beatmap().beat_count().div_ceil(size).max(1),
        };

        let mut plans = Vec::with_capacity(order.len() * iterations);
        for k in 0..iterations {
            let scope = Scope {
                song: self.primary,
                alias: None,
                level_len: size,
                offset: (k * size) as f64,
            };
            for &step in &order {
                if let Some(plan) = self.plan_node(&pattern.steps()[step], scope)? {
                    plans.push(plan);
                }
                self.position += 1;
            }
        }
        Ok(plans)
    }

    /// Playback order of the top-level steps: grouped slots receive a
    /// permutation of their group's members, everything else stays put.
    fn shuffle_order(&mut self, pattern: &Pattern) -> Vec<usize> {
        let mut order: Vec<usize> = (0..pattern.steps().len()).collect();
        for group in pattern.groups() {
            let mut members = group.slots.clone();
            members.shuffle(&mut self.rng);
            for (&slot, &member) in group.slots.iter().zip(&members) {
                order[slot] = member;
            }
            trace!(group = %group.id, ?members, "shuffled group");
        }
        order
    }

    fn plan_node(&mut self, node: &'a Node, scope: Scope<'a>) -> Result<Option<Plan<'a>>> {
        match node {
            Node::Beat(token) => self.plan_beat(token, scope),
            Node::Source { alias, child } => {
                let song = self.sources.resolve(alias)?;
                let scope = Scope {
                    song,
                    alias: Some(alias.as_str()),
                    ..scope
                };
                self.plan_node(child, scope)
            }
            Node::Simultaneous { mode, parts } => {
                let scope = Scope {
                    level_len: level_size(parts),
                    ..scope
                };
                let mut planned = Vec::with_capacity(parts.len());
                for part in parts {
                    if let Some(plan) = self.plan_node(part, scope)? {
                        planned.push(plan);
                    }
                }
                Ok((!planned.is_empty()).then(|| Plan::Mix {
                    mode: *mode,
                    parts: planned,
                }))
            }
        }
    }

    fn plan_beat(&mut self, token: &'a BeatToken, scope: Scope<'a>) -> Result<Option<Plan<'a>>> {
        let beatmap = scope.song.beatmap();
        let requested = self.resolve_ref(token.beat, scope.offset, beatmap.beat_count())?;
        let beat = match self.repeat {
            Repeat::Once => wrap_beat(requested, scope.level_len, beatmap)?,
            Repeat::Fill if beatmap.contains_beat(requested) => requested,
            Repeat::Fill => {
                trace!(position = self.position, beat = requested, "beat past the end, dropped");
                return Ok(None);
            }
        };
        let (start, end) = beatmap.window(beat).ok_or(BeatswapError::RenderRange {
            beat,
            beat_count: beatmap.beat_count(),
        })?;
        let (start, end) = slice_window(token.slice, start, end);

        trace!(
            position = self.position,
            requested,
            beat,
            source = scope.alias.unwrap_or("primary"),
            skip = token.skip,
            "planned beat"
        );

        Ok(Some(if token.skip {
            Plan::Silence { frames: end - start }
        } else {
            Plan::Extract {
                audio: scope.song.audio(),
                start,
                end,
                effects: &token.effects,
            }
        }))
    }

    /// Turn a beat reference into a 1-indexed beat number.
    fn resolve_ref(&mut self, beat: BeatRef, offset: f64, beat_count: usize) -> Result<f64> {
        match beat {
            BeatRef::Literal(n) => Ok(n + offset),
            BeatRef::Position(k) => i64::try_from(self.position)
                .ok()
                .and_then(|p| p.checked_add(1))
                .and_then(|p| p.checked_add(k))
                .map(|n| n as f64)
                .ok_or(BeatswapError::RenderRange {
                    beat: k as f64,
                    beat_count,
                }),
            BeatRef::Random { low, high, step } => {
                let choices = BeatRef::choices(low, high, step)
                    .ok_or(BeatswapError::RenderRange { beat: high, beat_count })?;
                let pick = self.rng.gen_range(0..choices);
                Ok(low + pick as f64 * step + offset)
            }
        }
    }
}

/// Bring `beat` into the map: first modulo the level length, then modulo the
/// beat count.
pub(crate) fn wrap_beat(beat: f64, level_len: usize, beatmap: &Beatmap) -> Result<f64> {
    if beatmap.contains_beat(beat) {
        return Ok(beat);
    }
    let beat_count = beatmap.beat_count();
    let out_of_range = BeatswapError::RenderRange { beat, beat_count };
    if !beat.is_finite() || beat_count == 0 {
        return Err(out_of_range);
    }
    if level_len > 0 {
        let wrapped = (beat - 1.0).rem_euclid(level_len as f64) + 1.0;
        if beatmap.contains_beat(wrapped) {
            return Ok(wrapped);
        }
    }
    let wrapped = (beat - 1.0).rem_euclid(beat_count as f64) + 1.0;
    if beatmap.contains_beat(wrapped) {
        Ok(wrapped)
    } else {
        Err(out_of_range)
    }
}

/// Narrow a beat window to the part kept by `slice`.
fn slice_window(slice: Option<Slice>, start: usize, end: usize) -> (usize, usize) {
    let len = (end - start) as f64;
    match slice {
        None => (start, end),
        Some(Slice::Head(frac)) => (start, start + (len * frac).round() as usize),
        Some(Slice::Tail(frac)) => (end - (len * frac).round() as usize, end),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::compile;

    fn song(beats: usize) -> Song {
        let len = beats * 10;
        let audio = AudioSource::mono(vec![0.0; len], 100).unwrap();
        let boundaries: Vec<usize> = (0..=beats).map(|b| b * 10).collect();
        Song::from_boundaries(audio, boundaries).unwrap()
    }

    fn ranges(plans: &[Plan<'_>]) -> Vec<(usize, usize)> {
        plans
            .iter()
            .map(|p| match p {
                Plan::Extract { start, end, .. } => (*start, *end),
                other => panic!("expected extract, got {other:?}"),
            })
            .collect()
    }

    fn plan_with(pattern: &str, song: &Song, seed: u64, repeat: Repeat) -> Vec<(usize, usize)> {
        let pattern = compile(pattern).unwrap();
        let table = SourceTable::new();
        let mut ctx = RenderContext::new(song, &table, seed, repeat);
        ranges(&ctx.plan(&pattern).unwrap())
    }

    #[test]
    fn wrap_keeps_in_range_beats() {
        let map = Beatmap::build(vec![0, 10, 20, 30, 40], 40).unwrap();
        assert_eq!(wrap_beat(3.0, 4, &map).unwrap(), 3.0);
        assert_eq!(wrap_beat(4.5, 4, &map).unwrap(), 4.5);
    }

    #[test]
    fn wrap_uses_level_length_first() {
        let map = Beatmap::build(vec![0, 10, 20, 30, 40], 40).unwrap();
        assert_eq!(wrap_beat(8.0, 3, &map).unwrap(), 2.0);
        assert_eq!(wrap_beat(0.0, 3, &map).unwrap(), 3.0);
        assert_eq!(wrap_beat(-1.0, 4, &map).unwrap(), 3.0);
    }

    #[test]
    fn wrap_falls_back_to_beat_count() {
        let map = Beatmap::build(vec![0, 10, 20], 20).unwrap();
        assert_eq!(wrap_beat(5.0, 6, &map).unwrap(), 1.0);
        assert_eq!(wrap_beat(4.0, 0, &map).unwrap(), 2.0);
    }

    #[test]
    fn wrap_rejects_unrepresentable_beats() {
        let map = Beatmap::build(vec![0, 10], 10).unwrap();
        assert!(wrap_beat(f64::NAN, 1, &map).is_err());
        let empty = map.shift(5.0);
        assert_eq!(empty.beat_count(), 0);
        assert!(matches!(
            wrap_beat(1.0, 1, &empty),
            Err(BeatswapError::RenderRange { beat_count: 0, .. })
        ));
    }

    /// Plan hand-built tokens, bypassing the parser's bounds.
    fn plan_tokens(tokens: Vec<BeatToken>, song: &Song) -> Result<usize> {
        let pattern = Pattern {
            steps: tokens.into_iter().map(Node::Beat).collect(),
            groups: Vec::new(),
        };
        let table = SourceTable::new();
        let mut ctx = RenderContext::new(song, &table, 0, Repeat::Once);
        ctx.plan(&pattern).map(|plans| plans.len())
    }

    #[test]
    fn position_overflow_is_a_range_error() {
        let s = song(4);
        let tokens = vec![
            BeatToken::new(BeatRef::Literal(1.0)),
            BeatToken::new(BeatRef::Position(i64::MAX)),
        ];
        assert!(matches!(
            plan_tokens(tokens, &s),
            Err(BeatswapError::RenderRange { beat_count: 4, .. })
        ));
        let near_edge = vec![BeatToken::new(BeatRef::Position(i64::MAX - 1))];
        assert!(plan_tokens(near_edge, &s).is_ok());
    }

    #[test]
    fn oversized_random_range_is_a_range_error() {
        let s = song(4);
        let tokens = vec![BeatToken::new(BeatRef::Random {
            low: 1.0,
            high: 2.0,
            step: 1e-40,
        })];
        assert!(matches!(
            plan_tokens(tokens, &s),
            Err(BeatswapError::RenderRange { .. })
        ));
    }

    #[test]
    fn slices_cut_head_and_tail() {
        assert_eq!(slice_window(None, 10, 20), (10, 20));
        assert_eq!(slice_window(Some(Slice::Head(0.5)), 10, 20), (10, 15));
        assert_eq!(slice_window(Some(Slice::Tail(0.25)), 0, 100), (75, 100));
    }

    #[test]
    fn position_variable_counts_steps() {
        let s = song(4);
        assert_eq!(
            plan_with("i,i,i,i", &s, 0, Repeat::Once),
            vec![(0, 10), (10, 20), (20, 30), (30, 40)]
        );
        assert_eq!(
            plan_with("i+1,i-1", &s, 0, Repeat::Once),
            vec![(10, 20), (0, 10)]
        );
    }

    #[test]
    fn skipped_steps_advance_position() {
        let pattern = compile("1,2,3,4!").unwrap();
        let s = song(4);
        let table = SourceTable::new();
        let mut ctx = RenderContext::new(&s, &table, 0, Repeat::Once);
        let plans = ctx.plan(&pattern).unwrap();
        assert_eq!(plans[3], Plan::Silence { frames: 10 });
        assert_eq!(ctx.position(), 4);
    }

    #[test]
    fn random_draws_stay_on_the_grid() {
        let s = song(8);
        for seed in 0..20 {
            for (start, _) in plan_with("@2_6_2,@2_6_2,@2_6_2", &s, seed, Repeat::Once) {
                assert!([10, 30, 50].contains(&start), "start {start}");
            }
        }
    }

    #[test]
    fn shuffle_permutes_only_group_slots() {
        let s = song(8);
        for seed in 0..20 {
            let plan = plan_with("1#a,2,3#a,4,5#a", &s, seed, Repeat::Once);
            assert_eq!(plan[1], (10, 20));
            assert_eq!(plan[3], (30, 40));
            let mut grouped = vec![plan[0], plan[2], plan[4]];
            grouped.sort();
            assert_eq!(grouped, vec![(0, 10), (20, 30), (40, 50)]);
        }
    }

    #[test]
    fn fill_tiles_across_the_beatmap() {
        let s = song(5);
        assert_eq!(
            plan_with("2,1", &s, 0, Repeat::Fill),
            vec![(10, 20), (0, 10), (30, 40), (20, 30), (40, 50)]
        );
    }

    #[test]
    fn fill_position_keeps_counting() {
        let s = song(4);
        assert_eq!(
            plan_with("i", &s, 0, Repeat::Fill),
            vec![(0, 10), (10, 20), (20, 30), (30, 40)]
        );
    }

    #[test]
    fn unknown_alias_fails_planning() {
        let pattern = compile("1,[nope]2").unwrap();
        let s = song(2);
        let table = SourceTable::new();
        let mut ctx = RenderContext::new(&s, &table, 0, Repeat::Once);
        assert!(matches!(
            ctx.plan(&pattern),
            Err(BeatswapError::UnknownSourceAlias { .. })
        ));
    }
}
