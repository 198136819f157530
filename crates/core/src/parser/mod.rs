//! Release-name parser.
//!
//! Turns free-form torrent names such as
//! `[SubsPlease] Sousou no Frieren - 05 (1080p) [A1B2C3D4].mkv` into the
//! attributes the ranker and the index filters work on. Every extractor is
//! an ordered list of patterns; the first pattern that matches (and yields a value
//! in range) wins. Nothing here can fail: unrecognised parts come back as
//! `None`, which the ranker treats as the worst bucket.

mod classify;
mod numbers;
mod quality;
mod text;

use serde::{Deserialize, Serialize};

pub use classify::{is_batch, is_ignored, is_movie, is_uncensored};
pub use numbers::{extract_episode, extract_season};
pub use quality::{
    extract_audio_codec, extract_fansub, extract_resolution, extract_source,
    extract_video_codec, AudioCodec, Source, VideoCodec,
};
pub use text::{matches_title, strip_season_markers, strip_special_characters};

/// Everything the parser can tell about a release name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedTitle {
    pub episode: Option<u32>,
    pub season: Option<u32>,
    /// Lowercased, e.g. `1080p`, `1920x1080`, `4k`.
    pub resolution: Option<String>,
    /// Lowercased leading bracket tag, e.g. `subsplease`.
    pub fansub: Option<String>,
    pub source: Option<Source>,
    pub video_codec: Option<VideoCodec>,
    pub audio_codec: Option<AudioCodec>,
    pub batch: bool,
    pub ignored: bool,
    pub uncensored: bool,
}

impl ParsedTitle {
    /// Parse every attribute of `name`.
    pub fn parse(name: &str) -> Self {
        Self {
            episode: extract_episode(name),
            season: extract_season(name),
            resolution: extract_resolution(name),
            fansub: extract_fansub(name),
            source: extract_source(name),
            video_codec: extract_video_codec(name),
            audio_codec: extract_audio_codec(name),
            batch: is_batch(name),
            ignored: is_ignored(name),
            uncensored: is_uncensored(name),
        }
    }
}
