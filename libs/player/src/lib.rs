//! Dual-source media player logic
//!
//! The host UI implements [`MediaElement`] and [`PlayerSurface`]; this crate
//! owns playback state, source swapping, drag-to-seek and the segment
//! overlay.

pub mod dual;
pub mod element;
pub mod error;
pub mod overlay;
pub mod player;

pub use dual::DualSourcePlayer;
pub use element::{MediaElement, PlayerSurface, TrackRect};
pub use error::{PlayerError, PlayerResult};
pub use overlay::{OverlayColor, OverlaySpan, format_time, overlay_spans};
pub use player::{MediaEvent, PlaybackState, Player, PlayerEvent, PlayerProps};
