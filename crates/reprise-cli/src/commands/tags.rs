use anyhow::Result;

use reprise_core::normalize::Normalizer;
use reprise_core::schema::Database;
use reprise_fetch::config::Config;
use reprise_fetch::lastfm::LastFmClient;
use reprise_fetch::playlist::enrich_artist_tags;

pub async fn run_tags(config: &Config, force: bool) -> Result<()> {
    let db = Database::open(&config.database_path)?;
    let normalizer = Normalizer::default();
    let client = LastFmClient::new(config.lastfm_api_key.clone());

    println!("Fetching Last.fm tags for indexed artists...");
    let summary = enrich_artist_tags(&db, &normalizer, &client, force).await?;

    println!(
        "Done: {} fetched, {} inherited, {} already cached, {} without tags",
        summary.fetched, summary.inherited, summary.skipped, summary.no_tags
    );
    Ok(())
}
