//! Original/processed comparison on a single playback surface

use client::ApiClient;
use common::{InputType, MediaJob, Segment, Variant};
use tracing::info;

use crate::{
    element::{MediaElement, PlayerSurface},
    player::{Player, PlayerProps},
};

pub struct DualSourcePlayer<M: MediaElement, S: PlayerSurface> {
    player: Player<M, S>,
    original_url: String,
    processed_url: String,
}

impl<M: MediaElement, S: PlayerSurface> DualSourcePlayer<M, S> {
    /// Preview a finished job, starting on the processed file
    pub fn for_job(media: M, surface: S, client: &ApiClient, job: &MediaJob) -> Self {
        Self::new(
            media,
            surface,
            client.download_url(job.id, Variant::Original),
            client.download_url(job.id, Variant::Processed),
            job.input_type,
            job.segments.clone(),
        )
    }

    pub fn new(
        media: M,
        surface: S,
        original_url: String,
        processed_url: String,
        kind: InputType,
        segments: Vec<Segment>,
    ) -> Self {
        let props = PlayerProps {
            segments,
            source: Variant::Processed,
            ..PlayerProps::new(processed_url.clone(), kind)
        };

        Self {
            player: Player::mount(media, surface, props),
            original_url,
            processed_url,
        }
    }

    pub fn active(&self) -> Variant {
        self.player.state().active_source
    }

    pub fn url(&self, variant: Variant) -> &str {
        match variant {
            Variant::Original => &self.original_url,
            Variant::Processed => &self.processed_url,
        }
    }

    pub fn player(&self) -> &Player<M, S> {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut Player<M, S> {
        &mut self.player
    }

    /// Switch to `variant`, keeping the position and play state
    pub fn show(&mut self, variant: Variant) {
        if variant == self.active() {
            return;
        }

        let state = self.player.state();
        let props = PlayerProps {
            src: self.url(variant).to_string(),
            start_time: state.current_time,
            start_playing: state.is_playing,
            source: variant,
            ..self.player.props().clone()
        };

        info!("Switching preview to the {} file", variant);
        self.player.update(props);
    }

    /// Flip between original and processed
    pub fn toggle_variant(&mut self) -> Variant {
        let next = self.active().toggled();
        self.show(next);
        next
    }
}
