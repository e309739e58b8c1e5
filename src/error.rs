//! Crate-level error type.
//!
//! Compile errors carry their own position-aware type ([`PatternError`]);
//! everything else that can go wrong while building beatmaps or rendering is a
//! [`BeatswapError`].

use thiserror::Error;

use crate::pattern::PatternError;

/// Result alias for beatswap operations.
pub type Result<T> = std::result::Result<T, BeatswapError>;

/// Errors raised by beatmap construction, rendering and configuration loading.
#[derive(Error, Debug)]
pub enum BeatswapError {
    #[error("invalid beatmap: {reason}")]
    InvalidBeatmap { reason: String },

    #[error("invalid audio: {reason}")]
    InvalidAudio { reason: String },

    #[error("pattern error: {0}")]
    Pattern(#[from] PatternError),

    #[error("unknown source alias: [{alias}]")]
    UnknownSourceAlias { alias: String },

    #[error("beat {beat} cannot be resolved against a beatmap of {beat_count} beats")]
    RenderRange { beat: f64, beat_count: usize },

    #[error("configuration error: {reason}")]
    Config { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BeatswapError {
    pub(crate) fn invalid_beatmap(reason: impl Into<String>) -> Self {
        Self::InvalidBeatmap {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_audio(reason: impl Into<String>) -> Self {
        Self::InvalidAudio {
            reason: reason.into(),
        }
    }

    /// Stable identifier for adapters that map errors to their own surface.
    pub fn error_code(&self) -> &'static str {
        match self {
            BeatswapError::InvalidBeatmap { .. } => "INVALID_BEATMAP",
            BeatswapError::InvalidAudio { .. } => "INVALID_AUDIO",
            BeatswapError::Pattern(e) => e.kind.code(),
            BeatswapError::UnknownSourceAlias { .. } => "UNKNOWN_SOURCE_ALIAS",
            BeatswapError::RenderRange { .. } => "RENDER_RANGE",
            BeatswapError::Config { .. } => "CONFIG_ERROR",
            BeatswapError::Io(_) => "IO_ERROR",
        }
    }

    /// Whether the caller can fix its input and retry.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BeatswapError::Pattern(_) | BeatswapError::UnknownSourceAlias { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::ErrorKind;

    #[test]
    fn pattern_errors_convert_and_keep_their_code() {
        let err: BeatswapError = PatternError::unknown_effect("unknown effect 'z'", 3).into();
        assert_eq!(err.error_code(), "UNKNOWN_EFFECT");
        assert!(err.is_recoverable());
        match err {
            BeatswapError::Pattern(e) => {
                assert_eq!(e.kind, ErrorKind::UnknownEffect);
                assert_eq!(e.position, 3);
            }
            other => panic!("expected pattern error, got {other:?}"),
        }
    }

    #[test]
    fn render_errors_are_not_recoverable() {
        let err = BeatswapError::RenderRange {
            beat: 3.0,
            beat_count: 0,
        };
        assert_eq!(err.error_code(), "RENDER_RANGE");
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("0 beats"));
    }

    #[test]
    fn alias_error_names_the_alias() {
        let err = BeatswapError::UnknownSourceAlias {
            alias: "song2".into(),
        };
        assert_eq!(err.to_string(), "unknown source alias: [song2]");
    }
}
