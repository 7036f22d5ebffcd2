//! Download backends with pre-download match verification.
//!
//! The preferred backend is spotdl. Before downloading we probe what Spotify
//! track spotdl would resolve the query to (`spotdl save`), run the resolved
//! metadata through the verifier, and only download when it is close enough
//! to what was requested. On a bad resolution, or when spotdl finds nothing,
//! we fall back to a yt-dlp YouTube search.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info, warn};
use serde::Deserialize;
use tokio::process::Command;
use tokio::time::timeout;

use reprise_core::verify::Verifier;

use crate::error::FetchResult;

/// How long to wait for a spotdl probe before giving up on it.
const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Which external downloader to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// spotdl (Spotify metadata, YouTube audio) with yt-dlp fallback.
    Spotdl,
    /// yt-dlp YouTube search, directly.
    Ytdlp,
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "spotdl" => Ok(Self::Spotdl),
            "ytdlp" | "yt-dlp" => Ok(Self::Ytdlp),
            other => Err(format!("unknown backend '{other}' (expected spotdl or ytdlp)")),
        }
    }
}

/// What spotdl resolved a query to, before any download happens.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub artist: String,
    pub name: String,
    pub url: String,
}

/// One entry of a spotdl save file. Depending on the spotdl version the
/// artist arrives either as a single `artist` string or an `artists` list.
#[derive(Debug, Deserialize)]
struct SaveEntry {
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    artist: Option<String>,
    #[serde(default)]
    artists: Option<Vec<String>>,
}

/// Downloads tracks via external tools, verifying resolutions first.
#[derive(Debug)]
pub struct Downloader<'a> {
    verifier: Verifier<'a>,
    backend: Backend,
}

impl<'a> Downloader<'a> {
    pub fn new(verifier: Verifier<'a>, backend: Backend) -> Self {
        Self { verifier, backend }
    }

    /// Download one track into `output_dir`. Returns true on success.
    ///
    /// # Errors
    ///
    /// Returns an error when the temporary save file cannot be created or
    /// read. Failures of the external tools themselves are reported as a
    /// `false` return, not an error, so a batch download can continue.
    pub async fn download(&self, artist: &str, title: &str, output_dir: &Path) -> FetchResult<bool> {
        match self.backend {
            Backend::Spotdl => self.download_with_spotdl(artist, title, output_dir).await,
            Backend::Ytdlp => Ok(download_with_ytdlp(artist, title, output_dir).await),
        }
    }

    async fn download_with_spotdl(
        &self,
        artist: &str,
        title: &str,
        output_dir: &Path,
    ) -> FetchResult<bool> {
        let query = format!("{artist} - {title}");

        if let Some(resolution) = probe_spotdl(&query).await? {
            let verdict = self
                .verifier
                .verify(artist, title, &resolution.artist, &resolution.name);

            if verdict.accepted {
                debug!(
                    "spotdl resolved '{}' to {} - {} (artist={:.2}, title={:.2})",
                    query, resolution.artist, resolution.name, verdict.artist_sim, verdict.title_sim
                );
                return Ok(spotdl_download_url(&resolution.url, output_dir).await);
            }

            warn!(
                "spotdl matched wrong track for '{}': {} - {} (artist={:.0}%, title={:.0}%), falling back to yt-dlp",
                query,
                resolution.artist,
                resolution.name,
                verdict.artist_sim * 100.0,
                verdict.title_sim * 100.0
            );
            return Ok(download_with_ytdlp(artist, title, output_dir).await);
        }

        info!("spotdl found no Spotify match for '{query}', trying yt-dlp");
        Ok(download_with_ytdlp(artist, title, output_dir).await)
    }
}

/// Ask spotdl what it would match for `query` without downloading anything.
///
/// Runs `spotdl save <query> --save-file <tmp>.spotdl` and parses the JSON
/// it writes. Returns `None` when spotdl fails, times out, or resolves
/// nothing; those are expected outcomes, not errors.
async fn probe_spotdl(query: &str) -> FetchResult<Option<Resolution>> {
    let save_file = tempfile::Builder::new()
        .prefix("reprise-")
        .suffix(".spotdl")
        .tempfile()?;
    let save_path: PathBuf = save_file.path().to_path_buf();

    let result = timeout(
        PROBE_TIMEOUT,
        Command::new("spotdl")
            .arg("save")
            .arg(query)
            .arg("--save-file")
            .arg(&save_path)
            .output(),
    )
    .await;

    let output = match result {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            warn!("failed to run spotdl: {e}");
            return Ok(None);
        }
        Err(_) => {
            warn!("spotdl probe timed out after {}s", PROBE_TIMEOUT.as_secs());
            return Ok(None);
        }
    };

    if !output.status.success() {
        debug!("spotdl save exited with {}", output.status);
        return Ok(None);
    }

    let raw = std::fs::read_to_string(&save_path)?;
    Ok(parse_save_file(&raw))
}

/// Parse the JSON a `spotdl save` run wrote. Tolerates both the `artist`
/// string and `artists` list shapes.
fn parse_save_file(raw: &str) -> Option<Resolution> {
    let entries: Vec<SaveEntry> = serde_json::from_str(raw).ok()?;
    let entry = entries.into_iter().next()?;

    let artist = match entry.artist {
        Some(a) if !a.is_empty() => a,
        _ => entry.artists.and_then(|a| a.into_iter().next())?,
    };

    if entry.url.is_empty() {
        return None;
    }

    Some(Resolution {
        artist,
        name: entry.name,
        url: entry.url,
    })
}

/// Download a verified Spotify URL with spotdl.
async fn spotdl_download_url(url: &str, output_dir: &Path) -> bool {
    let template = output_dir.join("{artist} - {title}.{output-ext}");

    let status = Command::new("spotdl")
        .arg(url)
        .arg("--output")
        .arg(&template)
        .status()
        .await;

    match status {
        Ok(status) => status.success(),
        Err(e) => {
            warn!("failed to run spotdl: {e}");
            false
        }
    }
}

/// Download via a yt-dlp YouTube search, extracting mp3 audio.
async fn download_with_ytdlp(artist: &str, title: &str, output_dir: &Path) -> bool {
    let query = format!("ytsearch1:{artist} {title} official audio");
    let template = output_dir.join(format!("{artist} - {title}.%(ext)s"));

    let status = Command::new("yt-dlp")
        .arg(&query)
        .arg("-x")
        .arg("--audio-format")
        .arg("mp3")
        .arg("--audio-quality")
        .arg("0")
        .arg("-o")
        .arg(&template)
        .arg("--no-playlist")
        .status()
        .await;

    match status {
        Ok(status) => status.success(),
        Err(e) => {
            warn!("failed to run yt-dlp: {e}");
            false
        }
    }
}
