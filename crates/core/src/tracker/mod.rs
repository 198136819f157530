//! Anime tracking service abstraction.
//!
//! The `Tracker` trait returns the user's current watch list with each
//! series' airing schedule; `AniListTracker` implements it over GraphQL.

mod anilist;
mod types;

pub use anilist::{parse_watchlist_page, AniListTracker, WatchlistPage};
pub use types::*;
