use once_cell::sync::Lazy;
use regex_lite::Regex;

static SEASON_MARKERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s+(?:season\s*\d+|s\s*\d+|\d+(?:st|nd|rd|th)\s+season|cour\s*\d+)")
        .expect("built-in pattern must compile")
});

/// Lowercase, keep ASCII letters, digits and whitespace, collapse runs of spaces.
pub fn strip_special_characters(text: &str) -> String {
    let kept: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove `Season 2`, `S2`, `2nd Season` and `Cour 2` markers from a title.
pub fn strip_season_markers(title: &str) -> String {
    SEASON_MARKERS.replace_all(title, "").trim().to_string()
}

/// Whether a release name mentions the title.
///
/// Case-insensitive substring match, retried with punctuation stripped from
/// both sides so `Kaguya-sama: wa Kokurasetai` matches `Kaguya-sama wa Kokurasetai`.
pub fn matches_title(name: &str, title: &str) -> bool {
    let title_lower = title.trim().to_lowercase();
    if title_lower.is_empty() {
        return false;
    }
    if name.to_lowercase().contains(&title_lower) {
        return true;
    }
    let stripped_title = strip_special_characters(title);
    !stripped_title.is_empty() && strip_special_characters(name).contains(&stripped_title)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_special_characters() {
        assert_eq!(
            strip_special_characters("Re:Zero  -Starting Life-"),
            "rezero starting life"
        );
        assert_eq!(strip_special_characters("!!!"), "");
    }

    #[test]
    fn test_strip_season_markers() {
        assert_eq!(strip_season_markers("Show Season 2"), "Show");
        assert_eq!(strip_season_markers("Show S2"), "Show");
        assert_eq!(strip_season_markers("Show 2nd Season"), "Show");
        assert_eq!(strip_season_markers("Show Cour 2"), "Show");
        assert_eq!(strip_season_markers("Show"), "Show");
    }

    #[test]
    fn test_matches_title() {
        assert!(matches_title("[SubsPlease] Sousou no Frieren - 05", "Sousou no Frieren"));
        assert!(matches_title("[SubsPlease] SOUSOU NO FRIEREN - 05", "sousou no frieren"));
        assert!(matches_title(
            "[Group] Kaguya-sama wa Kokurasetai - 03",
            "Kaguya-sama: wa Kokurasetai"
        ));
        assert!(!matches_title("[SubsPlease] Other Show - 05", "Sousou no Frieren"));
        assert!(!matches_title("[SubsPlease] Other Show - 05", ""));
        assert!(!matches_title("[SubsPlease] Other Show - 05", "!!"));
    }
}
