//! Torrent client abstraction.
//!
//! The `TorrentClient` trait lists, adds, deletes and relocates the
//! torrents this daemon owns (identified by a fixed category).
//! `QBittorrentClient` speaks the qBittorrent WebUI API.

mod qbittorrent;
mod types;

pub use qbittorrent::QBittorrentClient;
pub use types::*;
