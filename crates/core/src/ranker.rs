//! Ordering of torrent candidates.
//!
//! Two fixed lexicographic orderings over parsed attributes: one for
//! series episodes and one for movies. Each dimension maps to a bucket
//! where a lower number is more desirable; attributes the parser could not
//! find land in the worst bucket. Both sorts are stable. Episode size is
//! only compared between releases of the same resolution.

use std::cmp::Reverse;

use crate::indexer::TorrentCandidate;
use crate::parser::{AudioCodec, Source, VideoCodec};

/// Bucket for anything not listed in a priority table.
pub const UNKNOWN_BUCKET: u16 = 999;

const RESOLUTION_PRIORITY: &[(&str, u16)] = &[
    ("1080p", 0),
    ("720p", 1),
    ("480p", 2),
    ("4k", 3),
    ("8k", 4),
    ("fhd", 5),
    ("uhd", 6),
    ("hd", 7),
    ("2160p", 8),
    ("1440p", 9),
];

const FANSUB_PRIORITY: &[(&str, u16)] = &[
    ("subsplease", 0),
    ("erai-raws", 1),
    ("judas", 2),
    ("toonshub", 3),
    ("asw", 4),
    ("ember", 5),
    ("hd-zone", 6),
    ("kamig", 7),
    ("remix", 8),
    ("aniverse", 9),
    ("dub", 10),
    ("raw", 11),
];

pub fn resolution_bucket(resolution: Option<&str>) -> u16 {
    resolution
        .and_then(|res| {
            RESOLUTION_PRIORITY
                .iter()
                .find(|(name, _)| *name == res)
                .map(|(_, bucket)| *bucket)
        })
        .unwrap_or(UNKNOWN_BUCKET)
}

/// Best fansub bucket whose group name appears anywhere in the release name.
pub fn fansub_bucket(name: &str) -> u16 {
    let lower = name.to_lowercase();
    FANSUB_PRIORITY
        .iter()
        .filter(|(group, _)| lower.contains(group))
        .map(|(_, bucket)| *bucket)
        .min()
        .unwrap_or(UNKNOWN_BUCKET)
}

pub fn source_bucket(source: Option<Source>) -> u16 {
    match source {
        Some(Source::Bd) => 0,
        Some(Source::BdRip) => 1,
        Some(Source::BdRemux) => 2,
        Some(Source::WebDl) => 3,
        Some(Source::WebRip) => 4,
        Some(Source::Tv) => 5,
        Some(Source::Dvd) => 6,
        Some(Source::Hdtv) => 7,
        None => UNKNOWN_BUCKET,
    }
}

pub fn video_codec_bucket(codec: Option<VideoCodec>) -> u16 {
    match codec {
        Some(VideoCodec::Hevc) => 0,
        Some(VideoCodec::Av1) => 1,
        Some(VideoCodec::X265) => 2,
        Some(VideoCodec::H264) => 3,
        Some(VideoCodec::X264) => 4,
        Some(VideoCodec::Xvid) => 5,
        None => UNKNOWN_BUCKET,
    }
}

pub fn audio_codec_bucket(codec: Option<AudioCodec>) -> u16 {
    match codec {
        Some(AudioCodec::Flac) => 0,
        Some(AudioCodec::DtsHd) => 1,
        Some(AudioCodec::TrueHd) => 2,
        Some(AudioCodec::Ddp) => 3,
        Some(AudioCodec::Aac) => 4,
        Some(AudioCodec::Ac3) => 5,
        Some(AudioCodec::Mp3) => 6,
        None => UNKNOWN_BUCKET,
    }
}

/// Sort key for series episodes, without the size step.
///
/// A release that names a resolution beats one that does not, even when
/// both fall in the unknown bucket.
type EpisodeKey = (Reverse<bool>, u16, Reverse<bool>, u16, Reverse<u32>);

fn episode_key(candidate: &TorrentCandidate) -> EpisodeKey {
    let parsed = &candidate.parsed;
    (
        Reverse(parsed.uncensored),
        resolution_bucket(parsed.resolution.as_deref()),
        Reverse(parsed.resolution.is_some()),
        fansub_bucket(&candidate.name),
        Reverse(candidate.seeders),
    )
}

/// Within a run of equal keys, releases sharing a resolution are put
/// smallest first in the slots that resolution already occupies. Releases
/// of different resolutions keep their relative order.
fn order_by_size_within_resolution(run: &mut [TorrentCandidate]) {
    let mut placed = vec![false; run.len()];
    for start in 0..run.len() {
        if placed[start] {
            continue;
        }
        let Some(resolution) = run[start].parsed.resolution.clone() else {
            continue;
        };
        let slots: Vec<usize> = (start..run.len())
            .filter(|&i| run[i].parsed.resolution.as_deref() == Some(resolution.as_str()))
            .collect();
        let mut group: Vec<TorrentCandidate> = slots.iter().map(|&i| run[i].clone()).collect();
        group.sort_by_key(|c| c.size_bytes);
        for (slot, candidate) in slots.into_iter().zip(group) {
            run[slot] = candidate;
            placed[slot] = true;
        }
    }
}

type MovieKey = (u16, u16, u16, u16, u16, Reverse<u32>, u64);

fn movie_key(candidate: &TorrentCandidate) -> MovieKey {
    let parsed = &candidate.parsed;
    (
        source_bucket(parsed.source),
        resolution_bucket(parsed.resolution.as_deref()),
        video_codec_bucket(parsed.video_codec),
        fansub_bucket(&candidate.name),
        audio_codec_bucket(parsed.audio_codec),
        Reverse(candidate.seeders),
        candidate.size_bytes,
    )
}

/// Most desirable episode release first.
pub fn rank_episodes(candidates: &mut [TorrentCandidate]) {
    candidates.sort_by_cached_key(episode_key);
    for run in candidates.chunk_by_mut(|a, b| episode_key(a) == episode_key(b)) {
        order_by_size_within_resolution(run);
    }
}

/// Most desirable movie release first.
pub fn rank_movies(candidates: &mut [TorrentCandidate]) {
    candidates.sort_by_cached_key(movie_key);
}

/// Seeder count as reported by an index, e.g. `1,234`. Anything unparseable is 0.
pub fn parse_seeders(raw: &str) -> u32 {
    raw.trim().replace(',', "").parse().unwrap_or(0)
}

/// Human size such as `1.4 GiB` or `350 MiB`, in bytes. Unknown units yield 0.
pub fn parse_size(raw: &str) -> u64 {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == ','))
        .unwrap_or(raw.len());
    let (number, unit) = raw.split_at(split);
    let Ok(value) = number.replace(',', "").parse::<f64>() else {
        return 0;
    };

    let multiplier: f64 = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" | "bytes" => 1.0,
        "kib" | "kb" | "k" => 1024.0,
        "mib" | "mb" | "m" => 1024.0 * 1024.0,
        "gib" | "gb" | "g" => 1024.0 * 1024.0 * 1024.0,
        "tib" | "tb" | "t" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        _ => return 0,
    };
    (value * multiplier) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, seeders: u32, size_bytes: u64) -> TorrentCandidate {
        TorrentCandidate::new(name, format!("magnet:?dn={}", name), seeders, size_bytes)
    }

    fn names(candidates: &[TorrentCandidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_episode_ranking_by_resolution_then_fansub() {
        let mut candidates = vec![
            candidate("[Judas] Show - 05 [1080p]", 10, 100),
            candidate("[SubsPlease] Show - 05 (720p)", 10, 100),
            candidate("[Ember] Show - 05 [1080p]", 10, 100),
            candidate("[SubsPlease] Show - 05 (1080p)", 10, 100),
        ];
        rank_episodes(&mut candidates);

        assert_eq!(
            names(&candidates),
            vec![
                "[SubsPlease] Show - 05 (1080p)",
                "[Judas] Show - 05 [1080p]",
                "[Ember] Show - 05 [1080p]",
                "[SubsPlease] Show - 05 (720p)",
            ]
        );
    }

    #[test]
    fn test_uncensored_wins() {
        let mut candidates = vec![
            candidate("[SubsPlease] Show - 05 (1080p)", 500, 100),
            candidate("[Raw] Show - 05 (Uncensored) [480p]", 1, 100),
        ];
        rank_episodes(&mut candidates);
        assert!(candidates[0].name.contains("Uncensored"));
    }

    #[test]
    fn test_seeders_then_size() {
        let mut candidates = vec![
            candidate("[Group] Show - 05 [1080p] A", 5, 300),
            candidate("[Group] Show - 05 [1080p] B", 50, 900),
            candidate("[Group] Show - 05 [1080p] C", 5, 200),
        ];
        rank_episodes(&mut candidates);
        assert_eq!(
            names(&candidates),
            vec![
                "[Group] Show - 05 [1080p] B",
                "[Group] Show - 05 [1080p] C",
                "[Group] Show - 05 [1080p] A",
            ]
        );
    }

    #[test]
    fn test_unknown_resolution_ranks_last() {
        let mut candidates = vec![
            candidate("[SubsPlease] Show - 05", 100, 100),
            candidate("[SubsPlease] Show - 05 [1440p]", 1, 100),
        ];
        rank_episodes(&mut candidates);
        assert_eq!(candidates[0].name, "[SubsPlease] Show - 05 [1440p]");
    }

    #[test]
    fn test_equal_keys_keep_input_order() {
        let mut candidates = vec![
            candidate("[Group] Show - 05 [1080p]", 5, 100),
            candidate("[Group] Show - 05 [1080p]", 5, 100),
        ];
        candidates[0].magnet = "first".to_string();
        candidates[1].magnet = "second".to_string();
        rank_episodes(&mut candidates);
        assert_eq!(candidates[0].magnet, "first");
        assert_eq!(candidates[1].magnet, "second");
    }

    #[test]
    fn test_size_only_breaks_ties_between_equal_resolutions() {
        let mut candidates = vec![
            candidate("[A] Show - 05 [1920x1080]", 5, 900),
            candidate("[A] Show - 05 [1280x720]", 5, 100),
        ];
        candidates[0].magnet = "m1".to_string();
        candidates[1].magnet = "m2".to_string();
        rank_episodes(&mut candidates);
        assert_eq!(candidates[0].magnet, "m1");
        assert_eq!(candidates[1].magnet, "m2");

        // Same resolution string: smaller first, in the slots that string held.
        let mut candidates = vec![
            candidate("[A] Show - 05 [1920x1080] big", 5, 900),
            candidate("[A] Show - 05 [1280x720]", 5, 500),
            candidate("[A] Show - 05 [1920x1080] small", 5, 100),
        ];
        rank_episodes(&mut candidates);
        assert_eq!(
            names(&candidates),
            vec![
                "[A] Show - 05 [1920x1080] small",
                "[A] Show - 05 [1280x720]",
                "[A] Show - 05 [1920x1080] big",
            ]
        );
    }

    #[test]
    fn test_named_resolution_beats_missing_one() {
        let mut candidates = vec![
            candidate("[A] Show - 05", 5, 100),
            candidate("[A] Show - 05 [1920x1080]", 5, 100),
        ];
        rank_episodes(&mut candidates);
        assert_eq!(candidates[0].name, "[A] Show - 05 [1920x1080]");
    }

    #[test]
    fn test_movie_ranking() {
        let mut candidates = vec![
            candidate("[Group] Movie [WEB-DL 1080p x264 AAC]", 100, 100),
            candidate("[Group] Movie [BDRip 1080p x264 AAC]", 10, 100),
            candidate("[Group] Movie [BD 1080p HEVC FLAC]", 1, 100),
            candidate("[Group] Movie [BD 1080p x264 AAC]", 1, 100),
            candidate("[Group] Movie [BD 720p HEVC FLAC]", 1, 100),
        ];
        rank_movies(&mut candidates);
        assert_eq!(
            names(&candidates),
            vec![
                "[Group] Movie [BD 1080p HEVC FLAC]",
                "[Group] Movie [BD 1080p x264 AAC]",
                "[Group] Movie [BD 720p HEVC FLAC]",
                "[Group] Movie [BDRip 1080p x264 AAC]",
                "[Group] Movie [WEB-DL 1080p x264 AAC]",
            ]
        );
    }

    #[test]
    fn test_fansub_bucket_takes_best_match() {
        assert_eq!(fansub_bucket("[Erai-raws] Show - 01"), 1);
        assert_eq!(fansub_bucket("[Nobody] Show - 01"), UNKNOWN_BUCKET);
        assert_eq!(fansub_bucket("[SubsPlease] Show - 01"), 0);
    }

    #[test]
    fn test_parse_seeders() {
        assert_eq!(parse_seeders("1,234"), 1234);
        assert_eq!(parse_seeders(" 17 "), 17);
        assert_eq!(parse_seeders("n/a"), 0);
        assert_eq!(parse_seeders(""), 0);
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("1 KiB"), 1024);
        assert_eq!(parse_size("1.5 MiB"), 1_572_864);
        assert_eq!(parse_size("2 GiB"), 2 * 1024 * 1024 * 1024);
        assert_eq!(parse_size("700"), 700);
        assert_eq!(parse_size("12 parsecs"), 0);
        assert_eq!(parse_size("big"), 0);
    }
}
