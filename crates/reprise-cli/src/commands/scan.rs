use anyhow::Result;
use std::path::PathBuf;

use reprise_core::normalize::Normalizer;
use reprise_core::scan::{reconcile, LoftyTagReader};
use reprise_core::schema::Database;
use reprise_fetch::config::Config;

pub fn run_scan(config: &Config, path: Option<PathBuf>, force: bool) -> Result<()> {
    let root = path.unwrap_or_else(|| config.music_dir.clone());
    anyhow::ensure!(root.is_dir(), "music directory not found: {}", root.display());

    println!("Scanning {}...", root.display());

    let db = Database::open(&config.database_path)?;
    let normalizer = Normalizer::default();
    let tags = LoftyTagReader;

    let summary = reconcile(
        &db,
        &normalizer,
        &tags,
        &root,
        &config.audio_extensions,
        force,
    )?;

    println!(
        "Done: {} files indexed ({} added or updated, {} removed)",
        summary.total, summary.changed, summary.removed
    );
    Ok(())
}
