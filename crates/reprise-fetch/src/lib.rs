//! Remote side of reprise: Last.fm lookups, download backends, and
//! playlist generation.
//!
//! Everything here consumes the index and matching machinery from
//! `reprise-core`. The Last.fm client produces [`CandidateTrack`] lists the
//! match engine annotates, the downloader verifies resolutions before
//! fetching audio, and the playlist module turns the artist-tag cache into
//! m3u files.
//!
//! [`CandidateTrack`]: reprise_core::model::CandidateTrack

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod config;
pub mod download;
pub mod error;
pub mod lastfm;
pub mod playlist;

pub use error::{FetchError, FetchResult};
