//! Segment overlay on the progress track

use common::{ActionType, InputType, Segment};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayColor {
    Amber,
    Violet,
    Grey,
}

impl OverlayColor {
    pub fn for_action(action: &ActionType) -> Self {
        match action {
            ActionType::Mute => OverlayColor::Amber,
            ActionType::Blur => OverlayColor::Violet,
            ActionType::Other(_) => OverlayColor::Grey,
        }
    }

    pub fn hex(self) -> &'static str {
        match self {
            OverlayColor::Amber => "#f59e0b",
            OverlayColor::Violet => "#8b5cf6",
            OverlayColor::Grey => "#9ca3af",
        }
    }
}

/// A segment positioned on the track, in percent of its width
#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySpan {
    pub segment_id: i64,
    pub start_percent: f64,
    pub width_percent: f64,
    pub color: OverlayColor,
    pub label: String,
}

impl OverlaySpan {
    pub fn end_percent(&self) -> f64 {
        (self.start_percent + self.width_percent).min(100.0)
    }
}

/// Whether a segment is drawn for this kind of media.
///
/// Audio playback only shows mutes; a blur has nothing to describe there.
pub fn is_visible(segment: &Segment, kind: InputType) -> bool {
    match kind {
        InputType::Audio => segment.action_type == ActionType::Mute,
        InputType::Video => true,
    }
}

/// Spans for every visible, valid segment.
///
/// Segments are clipped to `duration_ms`; nothing is drawn until the
/// duration is known.
pub fn overlay_spans(segments: &[Segment], kind: InputType, duration_ms: f64) -> Vec<OverlaySpan> {
    if !(duration_ms.is_finite() && duration_ms > 0.0) {
        return Vec::new();
    }

    segments
        .iter()
        .filter(|segment| segment.is_valid() && is_visible(segment, kind))
        .filter_map(|segment| {
            let start = (segment.start_ms as f64).min(duration_ms);
            let end = (segment.end_ms as f64).min(duration_ms);
            if end <= start {
                return None;
            }

            let start_percent = start / duration_ms * 100.0;
            let width_percent = ((end - start) / duration_ms * 100.0).min(100.0 - start_percent);

            Some(OverlaySpan {
                segment_id: segment.id,
                start_percent,
                width_percent,
                color: OverlayColor::for_action(&segment.action_type),
                label: label(segment),
            })
        })
        .collect()
}

fn label(segment: &Segment) -> String {
    let action = segment.action_type.as_str();
    match segment.reason.as_deref().filter(|r| !r.trim().is_empty()) {
        Some(reason) => format!(
            "{} {}-{}: {}",
            action,
            format_time(segment.start_ms as f64 / 1000.0),
            format_time(segment.end_ms as f64 / 1000.0),
            reason
        ),
        None => format!(
            "{} {}-{}",
            action,
            format_time(segment.start_ms as f64 / 1000.0),
            format_time(segment.end_ms as f64 / 1000.0)
        ),
    }
}

/// `m:ss`; non-finite or negative input shows `0:00`
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0:00".to_string();
    }
    let total = seconds.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
