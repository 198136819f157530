//! Episode and season number patterns.

use once_cell::sync::Lazy;
use regex_lite::Regex;

pub(super) fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("built-in pattern must compile"))
        .collect()
}

static EPISODE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        // S01E05
        r"(?i)S\d{1,2}E(\d{1,3})",
        // " - 05", " - 05v2", " - 05 [..]", " - 05 (..)"
        r"(?i)\s-\s+(\d{1,3})(?:\s|v\d|$|\[|\()",
        r"(?i)\bEP\s*(\d{1,3})\b",
        r"(?i)\bEpisode\s*(\d{1,3})\b",
        r"(?i)\bE(\d{1,3})\b",
        r"\[(\d{1,3})\]",
        r"(?i)\s(\d{1,3})\.mkv",
        r"\s(\d{1,3})$",
    ])
});

static SEASON_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)\bS(\d{1,2})E",
        r"(?i)\bS(\d{1,2})\b",
        r"(?i)Season\s*(\d{1,2})",
        r"(?i)(\d{1,2})(?:st|nd|rd|th)\s+Season",
        // "2 - 07": the leading number is the season
        r"\b(\d{1,2})\s+-\s+\d{1,2}",
        r"(?i)\b(\d{1,2})\s+EP\d{1,3}",
        r"(?i)Cour\s*(\d{1,2})",
    ])
});

/// First pattern whose capture parses into the accepted range.
fn first_number(patterns: &[Regex], name: &str, range: std::ops::Range<u32>) -> Option<u32> {
    patterns.iter().find_map(|re| {
        let caps = re.captures(name)?;
        let n: u32 = caps.get(1)?.as_str().parse().ok()?;
        range.contains(&n).then_some(n)
    })
}

/// Episode number, 1 through 999.
pub fn extract_episode(name: &str) -> Option<u32> {
    first_number(&EPISODE_PATTERNS, name, 1..1000)
}

/// Season number, 1 through 99.
pub fn extract_season(name: &str) -> Option<u32> {
    first_number(&SEASON_PATTERNS, name, 1..100)
}
