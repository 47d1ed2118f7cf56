/// How far past the furthest watched position a viewer may seek.
pub const MAX_SEEK_AHEAD_SECS: f64 = 10.0;

/// Anti-skip guard for video modules.
///
/// Tracks the furthest position a viewer has actually reached and limits
/// forward seeks to a short window past it. Backward seeks are unrestricted.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SeekGuard {
    max_watched_secs: f64,
}

impl SeekGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_watched_secs(&self) -> f64 {
        self.max_watched_secs
    }

    /// Records a playback position reported during normal playback.
    pub fn observe(&mut self, position_secs: f64) {
        if position_secs.is_finite() && position_secs > self.max_watched_secs {
            self.max_watched_secs = position_secs;
        }
    }

    pub fn clamp_seek(&self, target_secs: f64) -> f64 {
        let limit = self.max_watched_secs + MAX_SEEK_AHEAD_SECS;
        if !target_secs.is_finite() {
            return self.max_watched_secs;
        }
        target_secs.clamp(0.0, limit)
    }
}
