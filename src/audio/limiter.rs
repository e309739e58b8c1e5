//! Output limiter — hard clamp to the valid amplitude range.

use super::Segment;

/// Hard limiter that clamps samples to `[-ceiling, ceiling]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Limiter {
    ceiling: f32,
}

impl Limiter {
    /// Create a new limiter. The ceiling is clamped into `(0.0, 1.0]`.
    pub fn new(ceiling: f32) -> Self {
        Self {
            ceiling: if ceiling.is_finite() && ceiling > 0.0 {
                ceiling.min(1.0)
            } else {
                1.0
            },
        }
    }

    /// Clamp a single sample.
    #[inline]
    pub fn process(&self, sample: f32) -> f32 {
        sample.clamp(-self.ceiling, self.ceiling)
    }

    /// Clamp a buffer in place.
    #[inline]
    pub fn process_block(&self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    /// Clamp every channel of a segment in place.
    pub fn process_segment(&self, segment: &mut Segment) {
        for channel in segment.channels_mut() {
            self.process_block(channel);
        }
    }

    pub fn ceiling(&self) -> f32 {
        self.ceiling
    }
}

impl Default for Limiter {
    fn default() -> Self {
        Self { ceiling: 1.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_within_range() {
        let limiter = Limiter::default();
        assert_eq!(limiter.process(0.5), 0.5);
        assert_eq!(limiter.process(-1.0), -1.0);
    }

    #[test]
    fn clamps_both_signs() {
        let limiter = Limiter::new(0.9);
        assert_eq!(limiter.process(1.7), 0.9);
        assert_eq!(limiter.process(-3.0), -0.9);
    }

    #[test]
    fn invalid_ceiling_falls_back_to_unity() {
        assert_eq!(Limiter::new(0.0).ceiling(), 1.0);
        assert_eq!(Limiter::new(f32::NAN).ceiling(), 1.0);
        assert_eq!(Limiter::new(4.0).ceiling(), 1.0);
    }

    #[test]
    fn clamps_segment() {
        let mut seg = Segment::new(vec![vec![2.0, -0.2], vec![-2.0, 0.3]]);
        Limiter::default().process_segment(&mut seg);
        assert_eq!(seg.channels(), &[vec![1.0, -0.2], vec![-1.0, 0.3]]);
    }
}
