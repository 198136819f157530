//! Resolution, fansub group, source and codec patterns.

use std::fmt;

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use super::numbers::compile;

static RESOLUTION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)\b(\d{3,4}p)\b",
        r"(?i)\b(\d{3,4}x\d{3,4})\b",
        r"(?i)\b(4K)\b",
        r"(?i)\b(8K)\b",
        r"(?i)\b(FHD)\b",
        r"(?i)\b(UHD)\b",
        r"(?i)\b(HD)\b",
    ])
});

static FANSUB: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[([^\]]+)\]|^\(([^\)]+)\)").expect("built-in pattern must compile"));

/// Where the video was ripped from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    #[serde(rename = "BD")]
    Bd,
    #[serde(rename = "BDRip")]
    BdRip,
    #[serde(rename = "BDRemux")]
    BdRemux,
    #[serde(rename = "WEB-DL")]
    WebDl,
    #[serde(rename = "WEBRip")]
    WebRip,
    #[serde(rename = "TV")]
    Tv,
    #[serde(rename = "DVD")]
    Dvd,
    #[serde(rename = "HDTV")]
    Hdtv,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Bd => "BD",
            Source::BdRip => "BDRip",
            Source::BdRemux => "BDRemux",
            Source::WebDl => "WEB-DL",
            Source::WebRip => "WEBRip",
            Source::Tv => "TV",
            Source::Dvd => "DVD",
            Source::Hdtv => "HDTV",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VideoCodec {
    #[serde(rename = "HEVC")]
    Hevc,
    #[serde(rename = "AV1")]
    Av1,
    #[serde(rename = "x265")]
    X265,
    #[serde(rename = "H.264")]
    H264,
    #[serde(rename = "x264")]
    X264,
    #[serde(rename = "XviD")]
    Xvid,
}

impl VideoCodec {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoCodec::Hevc => "HEVC",
            VideoCodec::Av1 => "AV1",
            VideoCodec::X265 => "x265",
            VideoCodec::H264 => "H.264",
            VideoCodec::X264 => "x264",
            VideoCodec::Xvid => "XviD",
        }
    }
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioCodec {
    #[serde(rename = "FLAC")]
    Flac,
    #[serde(rename = "DTS-HD")]
    DtsHd,
    #[serde(rename = "TrueHD")]
    TrueHd,
    #[serde(rename = "DDP")]
    Ddp,
    #[serde(rename = "AAC")]
    Aac,
    #[serde(rename = "AC3")]
    Ac3,
    #[serde(rename = "MP3")]
    Mp3,
}

impl AudioCodec {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioCodec::Flac => "FLAC",
            AudioCodec::DtsHd => "DTS-HD",
            AudioCodec::TrueHd => "TrueHD",
            AudioCodec::Ddp => "DDP",
            AudioCodec::Aac => "AAC",
            AudioCodec::Ac3 => "AC3",
            AudioCodec::Mp3 => "MP3",
        }
    }
}

impl fmt::Display for AudioCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Table mapping a pattern to the label it detects.
fn labelled<T: Copy>(entries: &[(&str, T)]) -> Vec<(Regex, T)> {
    entries
        .iter()
        .map(|(p, label)| (Regex::new(p).expect("built-in pattern must compile"), *label))
        .collect()
}

fn first_label<T: Copy>(patterns: &[(Regex, T)], name: &str) -> Option<T> {
    patterns
        .iter()
        .find(|(re, _)| re.is_match(name))
        .map(|(_, label)| *label)
}

static SOURCE_PATTERNS: Lazy<Vec<(Regex, Source)>> = Lazy::new(|| {
    labelled(&[
        (r"(?i)BDRemux", Source::BdRemux),
        (r"(?i)BDRip|BD\s*Ray", Source::BdRip),
        (r"(?i)Blu-?ray|Blu\s+ray|\bBD\b", Source::Bd),
        (r"(?i)WEB-?DL", Source::WebDl),
        (r"(?i)WEB-?Rip", Source::WebRip),
        (r"(?i)HDTV", Source::Hdtv),
        (r"(?i)\bTV\s*Rip|\bTV\b", Source::Tv),
        (r"(?i)DVD", Source::Dvd),
    ])
});

static VIDEO_PATTERNS: Lazy<Vec<(Regex, VideoCodec)>> = Lazy::new(|| {
    labelled(&[
        (r"(?i)HEVC|H\.?265", VideoCodec::Hevc),
        (r"(?i)x265", VideoCodec::X265),
        (r"(?i)\bAV1\b", VideoCodec::Av1),
        (r"(?i)H\.?264|\bAVC\b", VideoCodec::H264),
        (r"(?i)x264", VideoCodec::X264),
        (r"(?i)XviD", VideoCodec::Xvid),
    ])
});

static AUDIO_PATTERNS: Lazy<Vec<(Regex, AudioCodec)>> = Lazy::new(|| {
    labelled(&[
        (r"(?i)FLAC", AudioCodec::Flac),
        (r"(?i)DTS-?HD", AudioCodec::DtsHd),
        (r"(?i)TrueHD", AudioCodec::TrueHd),
        (r"(?i)DDP|DD\+|Dolby\s*Digital\s*Plus", AudioCodec::Ddp),
        (r"(?i)AAC", AudioCodec::Aac),
        (r"(?i)AC3|\bDD\b|Dolby\s*Digital", AudioCodec::Ac3),
        (r"(?i)MP3", AudioCodec::Mp3),
    ])
});

/// Lowercased resolution token, e.g. `1080p` or `4k`.
pub fn extract_resolution(name: &str) -> Option<String> {
    RESOLUTION_PATTERNS.iter().find_map(|re| {
        re.captures(name)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_lowercase())
    })
}

/// Leading `[Group]` or `(Group)` tag, lowercased.
pub fn extract_fansub(name: &str) -> Option<String> {
    let caps = FANSUB.captures(name)?;
    let tag = caps.get(1).or_else(|| caps.get(2))?.as_str().trim();
    (!tag.is_empty()).then(|| tag.to_lowercase())
}

pub fn extract_source(name: &str) -> Option<Source> {
    first_label(&SOURCE_PATTERNS, name)
}

/// HEVC and x265 are the same codec but rank separately.
pub fn extract_video_codec(name: &str) -> Option<VideoCodec> {
    first_label(&VIDEO_PATTERNS, name)
}

pub fn extract_audio_codec(name: &str) -> Option<AudioCodec> {
    first_label(&AUDIO_PATTERNS, name)
}
