//! Torrent index abstraction.
//!
//! The `Indexer` trait searches a public index for episodes, season packs
//! and movies. Implementations share the filters in [`filter`] so every
//! backend applies the same title, season and episode rules before ranking.

pub mod filter;
mod nyaa;
mod types;

pub use filter::SeriesQuery;
pub use nyaa::{parse_feed, NyaaIndexer};
pub use types::*;
