//! Seams between the player logic and the host's media engine and UI

use crate::error::PlayerResult;

/// A playable media element (an HTML `<video>`/`<audio>`, a native decoder, a fake in tests)
pub trait MediaElement {
    /// Replace the source; resets the element's own position
    fn load(&mut self, src: &str);
    fn play(&mut self) -> PlayerResult<()>;
    fn pause(&mut self);
    /// Position in seconds
    fn current_time(&self) -> f64;
    fn set_current_time(&mut self, seconds: f64);
    /// Length in seconds; NaN until metadata has loaded
    fn duration(&self) -> f64;
    fn set_volume(&mut self, volume: f64);
    fn set_muted(&mut self, muted: bool);
}

/// Horizontal bounds of the progress track in pointer coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackRect {
    pub left: f64,
    pub width: f64,
}

impl TrackRect {
    /// Fraction of the track under `client_x`, clamped to `0..=1`
    pub fn fraction(&self, client_x: f64) -> f64 {
        if !(self.width.is_finite() && self.width > 0.0) || !client_x.is_finite() {
            return 0.0;
        }
        ((client_x - self.left) / self.width).clamp(0.0, 1.0)
    }
}

/// The UI around the media element
pub trait PlayerSurface {
    fn track_rect(&self) -> TrackRect;
    /// Start receiving pointer move/up events from the whole window
    fn add_global_pointer_listeners(&mut self);
    fn remove_global_pointer_listeners(&mut self);
    /// Fullscreen the player container so custom controls stay visible
    fn request_fullscreen(&mut self) -> PlayerResult<()>;
    fn exit_fullscreen(&mut self) -> PlayerResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_fraction_is_clamped() {
        let rect = TrackRect {
            left: 100.0,
            width: 200.0,
        };
        assert_eq!(rect.fraction(200.0), 0.5);
        assert_eq!(rect.fraction(0.0), 0.0);
        assert_eq!(rect.fraction(1000.0), 1.0);
        assert_eq!(rect.fraction(f64::NAN), 0.0);

        let collapsed = TrackRect {
            left: 0.0,
            width: 0.0,
        };
        assert_eq!(collapsed.fraction(10.0), 0.0);
    }
}
