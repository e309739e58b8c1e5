//! Secondary sources addressed by `[alias]` in pattern text.

use std::collections::BTreeMap;

use crate::beatmap::Song;
use crate::error::{BeatswapError, Result};

/// Alias → song table for multi-source patterns.
#[derive(Debug, Clone, Default)]
pub struct SourceTable {
    songs: BTreeMap<String, Song>,
}

impl SourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `song` under `alias`, returning any song it replaced.
    pub fn insert(&mut self, alias: impl Into<String>, song: Song) -> Option<Song> {
        self.songs.insert(alias.into(), song)
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, alias: impl Into<String>, song: Song) -> Self {
        self.insert(alias, song);
        self
    }

    pub fn get(&self, alias: &str) -> Option<&Song> {
        self.songs.get(alias)
    }

    /// Look up `alias`, failing with [`BeatswapError::UnknownSourceAlias`].
    pub fn resolve(&self, alias: &str) -> Result<&Song> {
        self.get(alias)
            .ok_or_else(|| BeatswapError::UnknownSourceAlias {
                alias: alias.to_string(),
            })
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.songs.contains_key(alias)
    }

    /// Registered aliases in sorted order.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.songs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }
}
