//! Last.fm API client.
//!
//! Three lookup modes produce candidate tracks: top tracks for an artist
//! (popularity = play count), top tracks for a tag (no popularity signal),
//! and title search (popularity = listener count). The popularity metric is
//! mode-dependent and must not be compared across modes. A fourth call
//! fetches artist top tags for playlist enrichment.
//!
//! Last.fm serializes most counts as JSON strings and reports errors inside
//! a 200 body, so responses are checked for an error payload before typed
//! deserialization.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Semaphore;
use tokio::time::sleep;

use reprise_core::model::CandidateTrack;

use crate::error::{FetchError, FetchResult};

const LASTFM_API_BASE: &str = "https://ws.audioscrobbler.com/2.0/";

/// Per-source rate limiter: a single-permit semaphore held for a fixed
/// interval. Last.fm allows up to 5 requests per second for
/// non-commercial use.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
    interval: Duration,
}

impl RateLimiter {
    pub fn new(requests_per_second: u32) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(1)),
            interval: Duration::from_millis(1000 / u64::from(requests_per_second.max(1))),
        }
    }

    pub async fn acquire(&self) {
        // `acquire` only returns `Err` when the semaphore is closed, which
        // we never do, so `expect` is safe here.
        let _permit = self
            .semaphore
            .acquire()
            .await
            .expect("rate-limiter semaphore unexpectedly closed");
        sleep(self.interval).await;
    }
}

// ---------------------------------------------------------------------------
// API response types (private -- Last.fm nests JSON awkwardly)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ArtistRef {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TopTrack {
    name: String,
    artist: ArtistRef,
    #[serde(default)]
    playcount: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TrackList {
    #[serde(default)]
    track: Vec<TopTrack>,
}

#[derive(Debug, Deserialize)]
struct ArtistTopTracksResponse {
    toptracks: TrackList,
}

#[derive(Debug, Deserialize)]
struct TagTopTracksResponse {
    tracks: TrackList,
}

#[derive(Debug, Deserialize)]
struct SearchTrack {
    name: String,
    /// Plain string here, unlike the nested object in top-track responses.
    artist: String,
    #[serde(default)]
    listeners: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TrackMatches {
    #[serde(default)]
    track: Vec<SearchTrack>,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    trackmatches: TrackMatches,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: SearchResults,
}

#[derive(Debug, Deserialize)]
struct TopTagsResponse {
    toptags: TopTags,
}

#[derive(Debug, Deserialize)]
struct TopTags {
    #[serde(default)]
    tag: Vec<LastFmTag>,
}

/// A single folksonomy tag returned by the Last.fm API.
#[derive(Debug, Clone, Deserialize)]
pub struct LastFmTag {
    pub name: String,
    #[serde(default)]
    pub count: u32,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Last.fm API client with a shared rate limiter.
#[derive(Debug, Clone)]
pub struct LastFmClient {
    http: Client,
    api_key: String,
    rate_limiter: RateLimiter,
}

impl LastFmClient {
    pub fn new(api_key: String) -> Self {
        Self {
            http: Client::builder()
                .user_agent("reprise/0.1.0 (https://github.com/oxur/reprise)")
                .timeout(Duration::from_secs(10))
                .build()
                .expect("failed to build HTTP client"),
            api_key,
            rate_limiter: RateLimiter::new(5),
        }
    }

    /// Top tracks for an artist; popularity is the play count.
    pub async fn top_tracks_by_artist(
        &self,
        artist: &str,
        limit: u32,
    ) -> FetchResult<Vec<CandidateTrack>> {
        let value = self
            .call(&[
                ("method", "artist.gettoptracks"),
                ("artist", artist),
                ("limit", &limit.to_string()),
            ])
            .await?;
        let response: ArtistTopTracksResponse = parse(value)?;
        Ok(response
            .toptracks
            .track
            .into_iter()
            .map(|t| CandidateTrack::new(t.name, t.artist.name, parse_count(t.playcount.as_deref())))
            .collect())
    }

    /// Top tracks for a tag/genre; no popularity signal is available.
    pub async fn top_tracks_by_tag(&self, tag: &str, limit: u32) -> FetchResult<Vec<CandidateTrack>> {
        let value = self
            .call(&[
                ("method", "tag.gettoptracks"),
                ("tag", tag),
                ("limit", &limit.to_string()),
            ])
            .await?;
        let response: TagTopTracksResponse = parse(value)?;
        Ok(response
            .tracks
            .track
            .into_iter()
            .map(|t| CandidateTrack::new(t.name, t.artist.name, None))
            .collect())
    }

    /// Track search by title; popularity is the listener count.
    pub async fn search_by_title(&self, title: &str, limit: u32) -> FetchResult<Vec<CandidateTrack>> {
        let value = self
            .call(&[
                ("method", "track.search"),
                ("track", title),
                ("limit", &limit.to_string()),
            ])
            .await?;
        let response: SearchResponse = parse(value)?;
        Ok(response
            .results
            .trackmatches
            .track
            .into_iter()
            .map(|t| CandidateTrack::new(t.name, t.artist, parse_count(t.listeners.as_deref())))
            .collect())
    }

    /// Raw top tags for an artist, unfiltered.
    pub async fn artist_top_tags(&self, artist: &str) -> FetchResult<Vec<LastFmTag>> {
        let value = self
            .call(&[("method", "artist.gettoptags"), ("artist", artist)])
            .await?;
        let response: TopTagsResponse = parse(value)?;
        Ok(response.toptags.tag)
    }

    async fn call(&self, params: &[(&str, &str)]) -> FetchResult<serde_json::Value> {
        self.rate_limiter.acquire().await;

        let response = self
            .http
            .get(LASTFM_API_BASE)
            .query(params)
            .query(&[("api_key", self.api_key.as_str()), ("format", "json")])
            .send()
            .await?
            .error_for_status()
            .map_err(|e| FetchError::Http {
                source_name: "Last.fm".to_string(),
                message: e.to_string(),
            })?;

        let value: serde_json::Value = response.json().await.map_err(|e| FetchError::Parse {
            source_name: "Last.fm".to_string(),
            message: e.to_string(),
        })?;

        check_api_error(&value)?;
        Ok(value)
    }
}

/// Last.fm reports errors inside a 200 body: `{"error": 6, "message": ...}`.
fn check_api_error(value: &serde_json::Value) -> FetchResult<()> {
    if value.get("error").is_some() {
        let message = value
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown error")
            .to_string();
        return Err(FetchError::Api(message));
    }
    Ok(())
}

fn parse<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> FetchResult<T> {
    serde_json::from_value(value).map_err(|e| FetchError::Parse {
        source_name: "Last.fm".to_string(),
        message: e.to_string(),
    })
}

/// Counts arrive as JSON strings; anything unparseable is treated as absent.
fn parse_count(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artist_top_tracks_deserialize() {
        let json = r#"{
            "toptracks": {
                "track": [
                    {"name": "One More Time", "playcount": "12345678",
                     "artist": {"name": "Daft Punk"}},
                    {"name": "Aerodynamic", "artist": {"name": "Daft Punk"}}
                ]
            }
        }"#;
        let value: serde_json::Value = serde_json::from_str(json).unwrap();
        let response: ArtistTopTracksResponse = parse(value).unwrap();
        assert_eq!(response.toptracks.track.len(), 2);
        assert_eq!(response.toptracks.track[0].artist.name, "Daft Punk");
        assert_eq!(response.toptracks.track[0].playcount.as_deref(), Some("12345678"));
        assert!(response.toptracks.track[1].playcount.is_none());
    }

    #[test]
    fn test_search_response_has_flat_artist() {
        let json = r#"{
            "results": {
                "trackmatches": {
                    "track": [
                        {"name": "Let It Be", "artist": "The Beatles",
                         "listeners": "2000000"}
                    ]
                }
            }
        }"#;
        let value: serde_json::Value = serde_json::from_str(json).unwrap();
        let response: SearchResponse = parse(value).unwrap();
        assert_eq!(response.results.trackmatches.track[0].artist, "The Beatles");
    }

    #[test]
    fn test_empty_track_list_defaults() {
        let json = r#"{"toptracks": {}}"#;
        let value: serde_json::Value = serde_json::from_str(json).unwrap();
        let response: ArtistTopTracksResponse = parse(value).unwrap();
        assert!(response.toptracks.track.is_empty());
    }

    #[test]
    fn test_api_error_payload_detected() {
        let value: serde_json::Value =
            serde_json::from_str(r#"{"error": 6, "message": "Artist not found"}"#).unwrap();
        let err = check_api_error(&value).unwrap_err();
        assert!(matches!(err, FetchError::Api(m) if m == "Artist not found"));
    }

    #[test]
    fn test_parse_count_tolerates_garbage() {
        assert_eq!(parse_count(Some("123")), Some(123));
        assert_eq!(parse_count(Some("lots")), None);
        assert_eq!(parse_count(None), None);
    }

    #[test]
    fn test_top_tags_deserialize() {
        let json = r#"{
            "toptags": {
                "tag": [
                    {"name": "electronic", "count": 100},
                    {"name": "house", "count": 64}
                ]
            }
        }"#;
        let value: serde_json::Value = serde_json::from_str(json).unwrap();
        let response: TopTagsResponse = parse(value).unwrap();
        assert_eq!(response.toptags.tag.len(), 2);
        assert_eq!(response.toptags.tag[0].name, "electronic");
        assert_eq!(response.toptags.tag[0].count, 100);
    }
}
