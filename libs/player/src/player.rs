//! Playback controller for one media element
//!
//! The host forwards media events ([`MediaEvent`]) and user gestures to a
//! [`Player`]; the player drives the [`MediaElement`] and queues
//! [`PlayerEvent`]s for the host to pick up with [`Player::take_events`].
//!
//! A new `src` passed to [`Player::update`] is an edge: the element is
//! reloaded, positioned at the caller's start time and put in the caller's
//! play state. Updates with the same `src` never touch the element's
//! position.

use common::{InputType, Segment, Variant};
use tracing::{debug, warn};

use crate::{
    element::{MediaElement, PlayerSurface},
    error::PlayerResult,
    overlay::{OverlaySpan, overlay_spans},
};

/// Seeks during a drag smaller than this (seconds) are not sent to the element
pub const SEEK_DEADBAND_SECS: f64 = 0.1;

/// Inputs supplied by the owner of the player
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerProps {
    pub src: String,
    pub kind: InputType,
    /// Position to start from when `src` is (re)loaded
    pub start_time: f64,
    /// Whether to play once `src` is (re)loaded
    pub start_playing: bool,
    pub segments: Vec<Segment>,
    /// Which variant `src` points at
    pub source: Variant,
}

impl PlayerProps {
    pub fn new(src: impl Into<String>, kind: InputType) -> Self {
        Self {
            src: src.into(),
            kind,
            start_time: 0.0,
            start_playing: false,
            segments: Vec::new(),
            source: Variant::default(),
        }
    }
}

/// Client-local playback state
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub current_time: f64,
    pub duration: f64,
    pub is_playing: bool,
    pub volume: f64,
    pub is_muted: bool,
    pub active_source: Variant,
    pub is_dragging: bool,
    pub is_fullscreen: bool,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            current_time: 0.0,
            duration: 0.0,
            is_playing: false,
            volume: 1.0,
            is_muted: false,
            active_source: Variant::default(),
            is_dragging: false,
            is_fullscreen: false,
        }
    }
}

/// Events raised by the media element
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaEvent {
    TimeUpdate,
    LoadedMetadata,
    Ended,
}

/// Notifications for the owner of the player
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    SourceChanged { old: String, new: String },
    TimeChanged(f64),
    PlayStateChanged(bool),
}

pub struct Player<M: MediaElement, S: PlayerSurface> {
    media: M,
    surface: S,
    props: PlayerProps,
    state: PlaybackState,
    /// Start position waiting for metadata before it can be applied
    pending_start: Option<f64>,
    events: Vec<PlayerEvent>,
}

impl<M: MediaElement, S: PlayerSurface> Player<M, S> {
    /// Load `props.src` and apply its start time and play state
    pub fn mount(media: M, surface: S, props: PlayerProps) -> Self {
        let mut player = Self {
            media,
            surface,
            state: PlaybackState {
                active_source: props.source,
                ..PlaybackState::default()
            },
            props,
            pending_start: None,
            events: Vec::new(),
        };

        player.media.set_volume(player.state.volume);
        player.media.set_muted(player.state.is_muted);
        player.load_current();
        player
    }

    pub fn props(&self) -> &PlayerProps {
        &self.props
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Queued notifications, oldest first
    pub fn take_events(&mut self) -> Vec<PlayerEvent> {
        std::mem::take(&mut self.events)
    }

    /// Apply new props; reloads only when `src` changed
    pub fn update(&mut self, props: PlayerProps) {
        let source_changed = props.src != self.props.src;
        let old = std::mem::replace(&mut self.props, props);

        if !source_changed {
            return;
        }

        debug!("Player source changed: {} -> {}", old.src, self.props.src);
        if self.state.is_dragging {
            self.end_drag();
        }
        self.events.push(PlayerEvent::SourceChanged {
            old: old.src,
            new: self.props.src.clone(),
        });
        self.load_current();
    }

    fn load_current(&mut self) {
        let start = finite_or_zero(self.props.start_time).max(0.0);

        self.media.load(&self.props.src);
        self.media.set_current_time(start);
        self.pending_start = Some(start);

        self.state.active_source = self.props.source;
        self.state.current_time = start;
        self.state.duration = 0.0;
        self.events.push(PlayerEvent::TimeChanged(start));

        if self.props.start_playing {
            self.play();
        } else {
            self.media.pause();
            self.set_playing(false);
        }
    }

    pub fn handle_media_event(&mut self, event: MediaEvent) {
        match event {
            MediaEvent::LoadedMetadata => {
                self.state.duration = finite_or_zero(self.media.duration());
                if let Some(start) = self.pending_start.take() {
                    let start = if self.state.duration > 0.0 {
                        start.min(self.state.duration)
                    } else {
                        start
                    };
                    self.media.set_current_time(start);
                    self.state.current_time = start;
                }
            }
            MediaEvent::TimeUpdate => {
                if self.state.is_dragging {
                    return;
                }
                self.state.current_time = finite_or_zero(self.media.current_time());
                self.state.duration = finite_or_zero(self.media.duration());
                self.events
                    .push(PlayerEvent::TimeChanged(self.state.current_time));
            }
            MediaEvent::Ended => self.set_playing(false),
        }
    }

    /// Start playback; returns whether the element accepted
    pub fn play(&mut self) -> bool {
        match self.media.play() {
            Ok(()) => {
                self.set_playing(true);
                true
            }
            Err(e) => {
                warn!("Could not start playback of {}: {}", self.props.src, e);
                self.set_playing(false);
                false
            }
        }
    }

    pub fn pause(&mut self) {
        self.media.pause();
        self.set_playing(false);
    }

    pub fn toggle_play(&mut self) {
        if self.state.is_playing {
            self.pause();
        } else {
            self.play();
        }
    }

    fn set_playing(&mut self, playing: bool) {
        if self.state.is_playing != playing {
            self.state.is_playing = playing;
            self.events.push(PlayerEvent::PlayStateChanged(playing));
        }
    }

    /// Jump to `seconds`, clamped to the known duration
    pub fn seek(&mut self, seconds: f64) {
        let mut target = finite_or_zero(seconds).max(0.0);
        if self.state.duration > 0.0 {
            target = target.min(self.state.duration);
        }
        self.media.set_current_time(target);
        self.state.current_time = target;
        self.events.push(PlayerEvent::TimeChanged(target));
    }

    /// Pointer pressed on the track
    pub fn begin_drag(&mut self, client_x: f64) {
        if !self.state.is_dragging {
            self.state.is_dragging = true;
            self.surface.add_global_pointer_listeners();
        }
        self.scrub(client_x);
    }

    /// Pointer moved anywhere in the window
    pub fn drag_move(&mut self, client_x: f64) {
        if self.state.is_dragging {
            self.scrub(client_x);
        }
    }

    /// Pointer released anywhere in the window
    pub fn end_drag(&mut self) {
        if !self.state.is_dragging {
            return;
        }
        self.state.is_dragging = false;
        self.surface.remove_global_pointer_listeners();
        self.events
            .push(PlayerEvent::TimeChanged(self.state.current_time));
    }

    fn scrub(&mut self, client_x: f64) {
        let duration = finite_or_zero(self.media.duration());
        if duration <= 0.0 {
            return;
        }

        let target = self.surface.track_rect().fraction(client_x) * duration;
        self.state.current_time = target;
        self.state.duration = duration;

        if (self.media.current_time() - target).abs() > SEEK_DEADBAND_SECS {
            self.media.set_current_time(target);
        }
    }

    /// Set the volume in `0..=1`; zero mutes, anything else unmutes
    pub fn set_volume(&mut self, volume: f64) {
        let volume = finite_or_zero(volume).clamp(0.0, 1.0);
        self.state.volume = volume;
        self.media.set_volume(volume);
        self.set_muted(volume == 0.0);
    }

    /// Flip mute without touching the stored volume
    pub fn toggle_mute(&mut self) {
        self.set_muted(!self.state.is_muted);
    }

    fn set_muted(&mut self, muted: bool) {
        self.state.is_muted = muted;
        self.media.set_muted(muted);
    }

    pub fn toggle_fullscreen(&mut self) -> PlayerResult<()> {
        if self.state.is_fullscreen {
            self.surface.exit_fullscreen()?;
            self.state.is_fullscreen = false;
        } else {
            self.surface.request_fullscreen()?;
            self.state.is_fullscreen = true;
        }
        Ok(())
    }

    /// Position as a percentage of the duration
    pub fn progress_percent(&self) -> f64 {
        if self.state.duration > 0.0 {
            (self.state.current_time / self.state.duration * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        }
    }

    /// Segment spans to draw over the track
    pub fn overlay(&self) -> Vec<OverlaySpan> {
        overlay_spans(
            &self.props.segments,
            self.props.kind,
            self.state.duration * 1000.0,
        )
    }
}

impl<M: MediaElement, S: PlayerSurface> Drop for Player<M, S> {
    fn drop(&mut self) {
        if self.state.is_dragging {
            self.surface.remove_global_pointer_listeners();
        }
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}
