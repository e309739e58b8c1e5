//! Abstract syntax tree for compiled patterns.
//!
//! A [`Pattern`] is the top-level sequence: its steps play back to back. Each
//! step is a [`Node`]: a single beat, a source-aliased subtree, or a group of
//! parts mixed over the same time span.

use std::fmt;

use crate::effect::Effect;

/// A compiled pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub(crate) steps: Vec<Node>,
    pub(crate) groups: Vec<ShuffleGroup>,
}

impl Pattern {
    /// Top-level steps in written order.
    pub fn steps(&self) -> &[Node] {
        &self.steps
    }

    /// Shuffle groups in order of first appearance.
    pub fn groups(&self) -> &[ShuffleGroup] {
        &self.groups
    }

    /// Effective length of the top-level sequence: steps that count for size.
    pub fn size(&self) -> usize {
        level_size(&self.steps)
    }

    /// Every beat token in the pattern, depth first.
    pub fn beats(&self) -> Vec<&BeatToken> {
        let mut out = Vec::new();
        for step in &self.steps {
            step.collect_beats(&mut out);
        }
        out
    }

    /// Every source alias referenced, in order of first appearance.
    pub fn aliases(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for step in &self.steps {
            step.collect_aliases(&mut out);
        }
        out
    }
}

/// Number of nodes at one nesting level that count towards its size.
pub fn level_size(nodes: &[Node]) -> usize {
    nodes.iter().filter(|n| n.counts_for_size()).count()
}

/// A node of the pattern tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Beat(BeatToken),
    /// Parts rendered over the same span and mixed.
    Simultaneous { mode: MixMode, parts: Vec<Node> },
    /// A subtree whose beats resolve against an aliased source.
    Source { alias: String, child: Box<Node> },
}

impl Node {
    pub fn counts_for_size(&self) -> bool {
        match self {
            Node::Beat(beat) => !beat.ignore_for_size,
            Node::Simultaneous { parts, .. } => parts.iter().any(Node::counts_for_size),
            Node::Source { child, .. } => child.counts_for_size(),
        }
    }

    /// The shuffle group this node belongs to, if any.
    pub fn group(&self) -> Option<&str> {
        match self {
            Node::Beat(beat) => beat.group.as_deref(),
            Node::Source { child, .. } => child.group(),
            Node::Simultaneous { .. } => None,
        }
    }

    fn collect_beats<'a>(&'a self, out: &mut Vec<&'a BeatToken>) {
        match self {
            Node::Beat(beat) => out.push(beat),
            Node::Simultaneous { parts, .. } => parts.iter().for_each(|p| p.collect_beats(out)),
            Node::Source { child, .. } => child.collect_beats(out),
        }
    }

    fn collect_aliases<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Node::Beat(_) => {}
            Node::Simultaneous { parts, .. } => parts.iter().for_each(|p| p.collect_aliases(out)),
            Node::Source { alias, child } => {
                if !out.contains(&alias.as_str()) {
                    out.push(alias);
                }
                child.collect_aliases(out);
            }
        }
    }
}

/// How simultaneous parts are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixMode {
    /// `;`: sample-wise sum.
    Sum,
    /// `^`: sample-wise product.
    Product,
}

impl MixMode {
    pub fn symbol(self) -> char {
        match self {
            MixMode::Sum => ';',
            MixMode::Product => '^',
        }
    }
}

/// A single beat reference with its effects and modifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct BeatToken {
    pub beat: BeatRef,
    pub slice: Option<Slice>,
    pub effects: Vec<Effect>,
    /// `!`: occupies its slot as silence.
    pub skip: bool,
    /// `?`: not counted in the effective length of its level.
    pub ignore_for_size: bool,
    /// `#id`: shuffle group membership.
    pub group: Option<String>,
}

impl BeatToken {
    pub fn new(beat: BeatRef) -> Self {
        Self {
            beat,
            slice: None,
            effects: Vec::new(),
            skip: false,
            ignore_for_size: false,
            group: None,
        }
    }
}

/// Largest number of candidates a random reference may draw from.
pub const MAX_RANDOM_CHOICES: usize = 1 << 20;

/// Largest magnitude of a position offset (`i+k`).
pub const MAX_POSITION_OFFSET: i64 = 1 << 32;

/// Which beat a token plays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BeatRef {
    /// 1-indexed beat number, possibly fractional.
    Literal(f64),
    /// `i`, `i+k`, `i-k`: the beat at the current step, offset by `k`.
    Position(i64),
    /// `@low_high_step`: uniform choice from `low, low+step, ..., high`.
    Random { low: f64, high: f64, step: f64 },
}

impl BeatRef {
    /// Number of candidate values of a random reference, or `None` when the
    /// range is not finite or holds more than [`MAX_RANDOM_CHOICES`].
    pub fn choices(low: f64, high: f64, step: f64) -> Option<usize> {
        let span = ((high - low) / step + 1e-9).floor();
        if !span.is_finite() || span < 0.0 || span >= MAX_RANDOM_CHOICES as f64 {
            return None;
        }
        Some(span as usize + 1)
    }
}

/// Part of a beat window to keep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Slice {
    /// `>f`: the first fraction `f`.
    Head(f64),
    /// `<f`: the last fraction `f`.
    Tail(f64),
}

/// Steps sharing one `#id`, permuted together at render time.
#[derive(Debug, Clone, PartialEq)]
pub struct ShuffleGroup {
    pub id: String,
    /// Indices into [`Pattern::steps`], in written order.
    pub slots: Vec<usize>,
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Beat(beat) => write!(f, "{beat}"),
            Node::Simultaneous { mode, parts } => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{}", mode.symbol())?;
                    }
                    write!(f, "{part}")?;
                }
                Ok(())
            }
            Node::Source { alias, child } => write!(f, "[{alias}]{child}"),
        }
    }
}

impl fmt::Display for BeatToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.beat {
            BeatRef::Literal(n) => write!(f, "{n}")?,
            BeatRef::Position(0) => write!(f, "i")?,
            BeatRef::Position(k) if k > 0 => write!(f, "i+{k}")?,
            BeatRef::Position(k) => write!(f, "i-{}", -k)?,
            BeatRef::Random { low, high, step } => write!(f, "@{low}_{high}_{step}")?,
        }
        match self.slice {
            Some(Slice::Head(frac)) => write!(f, ">{frac}")?,
            Some(Slice::Tail(frac)) => write!(f, "<{frac}")?,
            None => {}
        }
        for effect in &self.effects {
            write!(f, "{effect}")?;
        }
        if self.skip {
            write!(f, "!")?;
        }
        if self.ignore_for_size {
            write!(f, "?")?;
        }
        if let Some(group) = &self.group {
            write!(f, "#{group}")?;
        }
        Ok(())
    }
}
