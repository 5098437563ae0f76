//! Displayed progress, decoupled from the backend's coarse updates
//!
//! [`smooth`] catches the displayed value up with the true one and, once
//! caught up, lets it creep ahead by a bounded amount so long gaps between
//! polls do not look frozen. It never moves backwards, never overshoots the
//! true value while behind, and reaches 100 only once the true value does.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct SmoothingParams {
    /// Share of the remaining gap closed per second, as an exponential rate
    pub catch_up_rate: f64,
    /// Points per second added while caught up
    pub creep_rate: f64,
    /// How far ahead of the true value creeping may go
    pub lookahead: f64,
    /// Creeping never passes this value
    pub ceiling: f64,
    /// Gaps below this snap to the target
    pub epsilon: f64,
}

impl Default for SmoothingParams {
    fn default() -> Self {
        Self {
            catch_up_rate: 4.0,
            creep_rate: 0.5,
            lookahead: 10.0,
            ceiling: 99.0,
            epsilon: 0.05,
        }
    }
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// Next displayed value after `dt`
pub fn smooth(prev: f64, target: f64, dt: Duration, params: &SmoothingParams) -> f64 {
    let prev = clamp_percent(prev);
    let target = clamp_percent(target);
    let dt = dt.as_secs_f64();

    if prev < target {
        let gap = target - prev;
        let next = prev + gap * (1.0 - (-params.catch_up_rate * dt).exp());
        if target - next < params.epsilon {
            return target;
        }
        return next.min(target);
    }

    if target >= 100.0 {
        return 100.0;
    }

    let limit = (target + params.lookahead).min(params.ceiling).min(99.999);
    if prev >= limit {
        return prev;
    }

    (prev + params.creep_rate * dt).min(limit).max(prev)
}

/// Single animation driver state for a progress bar
#[derive(Debug, Clone)]
pub struct VisualProgress {
    value: f64,
    target: f64,
    params: SmoothingParams,
}

impl Default for VisualProgress {
    fn default() -> Self {
        Self::new(SmoothingParams::default())
    }
}

impl VisualProgress {
    pub fn new(params: SmoothingParams) -> Self {
        Self {
            value: 0.0,
            target: 0.0,
            params,
        }
    }

    /// Record the latest backend progress
    pub fn set_target(&mut self, progress: u32) {
        self.target = f64::from(progress.min(100));
    }

    /// Advance by one animation frame and return the displayed value
    pub fn tick(&mut self, dt: Duration) -> f64 {
        self.value = smooth(self.value, self.target, dt, &self.params);
        self.value
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    /// Whole percent for display; 100 only when complete
    pub fn percent(&self) -> u32 {
        self.value.floor() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: Duration = Duration::from_millis(16);

    #[test]
    fn test_catch_up_never_overshoots() {
        let params = SmoothingParams::default();
        let mut value = 0.0;
        for _ in 0..10 {
            let next = smooth(value, 50.0, FRAME, &params);
            assert!(next > value);
            assert!(next <= 50.0);
            value = next;
        }
    }

    #[test]
    fn test_snaps_to_target_when_close() {
        let params = SmoothingParams::default();
        assert_eq!(smooth(49.99, 50.0, FRAME, &params), 50.0);
    }

    #[test]
    fn test_creep_is_capped() {
        let params = SmoothingParams::default();
        let mut value = 20.0;
        for _ in 0..10_000 {
            value = smooth(value, 20.0, FRAME, &params);
        }
        assert_eq!(value, 30.0);

        let mut value = 95.0;
        for _ in 0..10_000 {
            value = smooth(value, 95.0, FRAME, &params);
        }
        assert_eq!(value, 99.0);
    }

    #[test]
    fn test_reaches_100_only_with_target() {
        let params = SmoothingParams::default();
        let mut value = 0.0;
        for _ in 0..100_000 {
            value = smooth(value, 99.0, FRAME, &params);
            assert!(value < 100.0);
        }

        let mut frames = 0;
        while value < 100.0 && frames < 10_000 {
            value = smooth(value, 100.0, FRAME, &params);
            frames += 1;
        }
        assert_eq!(value, 100.0);
    }

    #[test]
    fn test_zero_elapsed_is_stable() {
        let params = SmoothingParams::default();
        assert_eq!(smooth(12.0, 40.0, Duration::ZERO, &params), 12.0);
        assert_eq!(smooth(12.0, 12.0, Duration::ZERO, &params), 12.0);
    }

    #[test]
    fn test_never_decreases_and_stays_within_lookahead() {
        let params = SmoothingParams::default();
        let sequences: [&[u32]; 4] = [
            &[0, 20, 55, 95, 100],
            &[0, 0, 0, 5, 5, 5, 80],
            &[10, 10, 10, 10, 10],
            &[0, 99, 99, 99, 100],
        ];

        for sequence in sequences {
            let mut progress = VisualProgress::new(params.clone());
            let mut previous = 0.0;
            for &target in sequence {
                progress.set_target(target);
                for frame in 0..500 {
                    let dt = Duration::from_millis(5 + (frame % 40));
                    let value = progress.tick(dt);
                    assert!(value >= previous, "{value} < {previous}");
                    assert!(value <= f64::from(target) + params.lookahead);
                    if target < 100 {
                        assert!(value < 100.0);
                    }
                    previous = value;
                }
            }
            let last = sequence[sequence.len() - 1];
            assert!(progress.percent() >= last);
            if last == 100 {
                assert_eq!(progress.percent(), 100);
            }
        }
    }

    #[test]
    fn test_garbage_input_is_clamped() {
        let params = SmoothingParams::default();
        let from_nan = smooth(f64::NAN, 0.0, FRAME, &params);
        assert!((0.0..=params.lookahead).contains(&from_nan));
        assert!(from_nan < 100.0);
        assert!(smooth(150.0, 100.0, FRAME, &params) <= 100.0);
    }
}
