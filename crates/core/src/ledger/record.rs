use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One downloaded episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    /// Tracker airing id; at most one record per id.
    pub episode_id: i64,
    /// Torrent hash in the download client.
    pub episode_hash: String,
    /// Display name, e.g. `Frieren - Episode 5`.
    #[serde(default)]
    pub episode_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_date: Option<DateTime<Utc>>,
}

impl EpisodeRecord {
    pub fn new(episode_id: i64, episode_hash: impl Into<String>, episode_name: impl Into<String>) -> Self {
        Self {
            episode_id,
            episode_hash: episode_hash.into(),
            episode_name: episode_name.into(),
            download_date: None,
        }
    }

    pub fn downloaded_at(mut self, date: DateTime<Utc>) -> Self {
        self.download_date = Some(date);
        self
    }
}

/// Parse one ledger line.
///
/// `Ok(None)` for blank lines. JSON objects are the current form;
/// `id:hash[:name]` is accepted from older files.
pub fn parse_line(line: &str) -> Result<Option<EpisodeRecord>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    if line.starts_with('{') {
        let record: EpisodeRecord =
            serde_json::from_str(line).map_err(|e| format!("invalid JSON record: {}", e))?;
        if record.episode_hash.is_empty() {
            return Err("episode hash cannot be empty".to_string());
        }
        return Ok(Some(record));
    }

    let mut parts = line.splitn(3, ':');
    let id = parts.next().unwrap_or_default();
    let hash = parts
        .next()
        .ok_or_else(|| format!("expected 'id:hash' or 'id:hash:name', got '{}'", line))?;
    let name = parts.next().unwrap_or_default();

    let episode_id: i64 = id
        .trim()
        .parse()
        .map_err(|_| format!("invalid episode id '{}'", id))?;
    if hash.is_empty() {
        return Err("episode hash cannot be empty".to_string());
    }

    Ok(Some(EpisodeRecord::new(episode_id, hash, name)))
}

/// Serialize a record as a single line, without the trailing newline.
pub fn to_line(record: &EpisodeRecord) -> Result<String, serde_json::Error> {
    serde_json::to_string(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_json_line() {
        let record = parse_line(
            r#"{"episode_id":101,"episode_hash":"abc","episode_name":"Show - Episode 1"}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(record, EpisodeRecord::new(101, "abc", "Show - Episode 1"));
    }

    #[test]
    fn test_parse_legacy_lines() {
        assert_eq!(
            parse_line("101:abc").unwrap(),
            Some(EpisodeRecord::new(101, "abc", ""))
        );
        assert_eq!(
            parse_line("  102:def:Re:Zero - Episode 2  ").unwrap(),
            Some(EpisodeRecord::new(102, "def", "Re:Zero - Episode 2"))
        );
    }

    #[test]
    fn test_parse_blank_and_malformed() {
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("   \t").unwrap(), None);
        assert!(parse_line("just-text").is_err());
        assert!(parse_line("abc:hash").is_err());
        assert!(parse_line("101:").is_err());
        assert!(parse_line("{not json").is_err());
        assert!(parse_line(r#"{"episode_id":1,"episode_hash":""}"#).is_err());
    }

    #[test]
    fn test_line_round_trip() {
        let record = EpisodeRecord::new(7, "hash", "Name: with colon")
            .downloaded_at(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap());
        let line = to_line(&record).unwrap();
        assert!(!line.contains('\n'));
        assert_eq!(parse_line(&line).unwrap(), Some(record));
    }
}
