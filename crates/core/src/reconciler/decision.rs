/// What the reconciler knows about one airing episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EpisodeFacts {
    /// The ledger holds a row for this episode.
    pub already_saved: bool,
    pub aired: bool,
    /// The series carries the excluded custom-list tag.
    pub excluded: bool,
    /// Episode number is within the user's progress.
    pub watched: bool,
    /// A client torrent carries the expected display name.
    pub in_client: bool,
    /// The series already reached its episode cap this cycle.
    pub saturated: bool,
}

/// Outcome for one episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeDecision {
    Skip,
    /// Drop the ledger row and the torrent (when eviction is enabled).
    Evict,
    /// Saved and present in the client; counts toward the cap.
    Keep,
    /// Enqueue; `redownload` when a saved episode vanished from the client.
    Download { redownload: bool },
}

impl EpisodeDecision {
    pub fn should_download(&self) -> bool {
        matches!(self, EpisodeDecision::Download { .. })
    }

    pub fn should_delete(&self) -> bool {
        matches!(self, EpisodeDecision::Evict)
    }

    /// The episode occupies one of the series' slots.
    pub fn counts_toward_cap(&self) -> bool {
        matches!(self, EpisodeDecision::Keep | EpisodeDecision::Download { .. })
    }
}

/// Decision table, first matching row wins.
pub fn decide_episode(facts: EpisodeFacts) -> EpisodeDecision {
    let carry = if facts.already_saved {
        EpisodeDecision::Evict
    } else {
        EpisodeDecision::Skip
    };

    if facts.excluded || facts.watched {
        return carry;
    }
    if facts.already_saved {
        return match (facts.saturated, facts.in_client) {
            (true, _) => EpisodeDecision::Evict,
            (false, true) => EpisodeDecision::Keep,
            (false, false) => EpisodeDecision::Download { redownload: true },
        };
    }
    if !facts.aired || facts.saturated {
        return EpisodeDecision::Skip;
    }
    EpisodeDecision::Download { redownload: false }
}
