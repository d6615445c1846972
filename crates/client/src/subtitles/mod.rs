//! Subtitle sources.
//!
//! Only YouTube is covered. Each source reports which URLs it handles via
//! `is_supported`; the orchestrator skips the rest.

pub mod youtube;

pub use youtube::{CaptionTrack, YoutubeSubtitles, caption_tracks, choose_track, parse_timedtext};
