//! Release classification: batch packs, movies, unwanted encodes.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::numbers::{compile, extract_episode};

static BATCH_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)\(batch\)|\[batch\]|\sbatch(\s|$)",
        r"(?i)\(unofficial\s+batch\)",
        // "(01-28)", "(1 ~ 12)"
        r"(?i)\(\d{1,3}\s*[-~]\s*\d{1,3}\)",
        r"(?i)\s\d{1,3}\s*[-~]\s*\d{1,3}\s",
        r"(?i)\(complete\)|\[complete\]|\scomplete(\s|$)",
        r"(?i)complete\s+series|complete\s+season",
        r"(?i)\(season\s+\d+.*complete\)",
        r"(?i)\(s\d{1,2}\)|\[s\d{1,2}\]",
        r"(?i)\(season\s+\d+\)|\[season\s+\d+\]",
        r"(?i)\(\d{1,2}(st|nd|rd|th)\s+season\)",
        r"(?i)\bseason\s+\d+\s*\([^)]*\)",
        r"(?i)\.s\d{1,2}\.",
        r"(?i)\bs\d{1,2}\s+\(.*bd",
        r"(?i)s\d{1,2}\s+\((1080p|720p|480p)\)",
        r"(?i)s\d{1,2}\s+(1080p|720p)",
        r"(?i)s\d{1,2}\.+(1080p|720p)",
    ])
});

static MOVIE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)\(movie\)|\[movie\]|\bmovie\b",
        r"(?i)\(film\)|\[film\]",
        r"(?i)gekijouban",
        r"(?i)theater\s+version",
        r"(?i)theatrical",
        r"(?i)\b(ova|ona)\b|original\s+(video|net)\s+animation",
        r"(?i)\(special\)|\[special\]|\bspecial\b|tv\s+special|episode\s+sp\b",
    ])
});

static IGNORED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\[dub\]|\[raw\]|\[hardcoded\]|\[hc\]|re-encode")
        .expect("built-in pattern must compile")
});

/// Whether the name looks like a multi-episode pack.
pub fn is_batch(name: &str) -> bool {
    BATCH_PATTERNS.iter().any(|re| re.is_match(name))
}

/// Whether the name is a standalone work rather than a series episode.
///
/// `format_hint` is set when the tracker already reports the entry as a
/// movie; a name with no episode number that is not a batch also counts.
pub fn is_movie(name: &str, format_hint: bool) -> bool {
    if format_hint || MOVIE_PATTERNS.iter().any(|re| re.is_match(name)) {
        return true;
    }
    extract_episode(name).is_none() && !is_batch(name)
}

/// Dubs, raws, hardsubs and re-encodes.
pub fn is_ignored(name: &str) -> bool {
    IGNORED.is_match(name)
}

pub fn is_uncensored(name: &str) -> bool {
    name.to_lowercase().contains("uncensored")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_ranges() {
        assert!(is_batch("[SubsPlease] Frieren (01-28) [1080p]"));
        assert!(!is_batch("[SubsPlease] Frieren - 05 [1080p]"));
        assert!(is_batch("[Group] Show (1 ~ 12) [720p]"));
        assert!(is_batch("[Group] Show 01 - 12 [1080p]"));
    }

    #[test]
    fn test_batch_markers() {
        assert!(is_batch("[Group] Show (Batch) [1080p]"));
        assert!(is_batch("[Group] Show [Complete]"));
        assert!(is_batch("[Group] Show Complete Series"));
        assert!(is_batch("[Group] Show (Season 2) [1080p]"));
        assert!(is_batch("[Group] Show (2nd Season)"));
        assert!(is_batch("Show.S02.1080p.WEB-DL"));
        assert!(is_batch("[Group] Show S2 1080p"));
        assert!(is_batch("[Group] Show S01 (BD 1080p)"));
    }

    #[test]
    fn test_movie() {
        assert!(is_movie("[Group] Show Movie [1080p]", false));
        assert!(is_movie("[Group] Gekijouban Show [1080p]", false));
        assert!(is_movie("[Group] Show OVA [1080p]", false));
        assert!(is_movie("[Group] Kimi no Na wa (2016) [BD 1080p]", false));
        assert!(!is_movie("[SubsPlease] Show - 05 (1080p)", false));
        assert!(is_movie("[SubsPlease] Show - 05 (1080p)", true));
        // A batch without an episode number is not a movie.
        assert!(!is_movie("[Group] Show (01-12) [1080p]", false));
    }

    #[test]
    fn test_ignored_and_uncensored() {
        assert!(is_ignored("[Group] Show - 01 [Dub] [1080p]"));
        assert!(is_ignored("[Group] Show - 01 [RAW]"));
        assert!(is_ignored("[Group] Show - 01 [HC]"));
        assert!(is_ignored("[Group] Show - 01 re-encode"));
        assert!(!is_ignored("[SubsPlease] Show - 01 (1080p)"));

        assert!(is_uncensored("[Group] Show - 01 (Uncensored)"));
        assert!(!is_uncensored("[Group] Show - 01"));
    }
}
