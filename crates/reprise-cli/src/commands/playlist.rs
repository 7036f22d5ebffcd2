use anyhow::Result;
use std::path::PathBuf;

use reprise_core::schema::Database;
use reprise_fetch::config::Config;
use reprise_fetch::playlist::{available_tags, generate_all, generate_playlist};

#[allow(clippy::fn_params_excessive_bools)]
pub fn run_playlist(
    config: &Config,
    tag: Option<String>,
    all: bool,
    output: Option<PathBuf>,
    min_songs: usize,
    max_playlists: usize,
    list: bool,
) -> Result<()> {
    let db = Database::open(&config.database_path)?;
    let output_dir = output.unwrap_or_else(|| config.music_dir.join("Playlists"));

    if list {
        let tags = available_tags(&db, 2)?;
        if tags.is_empty() {
            println!("No tags cached yet. Run 'reprise tags' first.");
            return Ok(());
        }
        println!("Available tags (artists):");
        for (tag, count) in tags {
            println!("  {tag:<30} {count}");
        }
        return Ok(());
    }

    if all {
        let results = generate_all(&db, &output_dir, min_songs, max_playlists)?;
        if results.is_empty() {
            println!("No playlists generated. Run 'reprise tags' first.");
            return Ok(());
        }
        for (tag, count) in &results {
            println!("  {tag}: {count} tracks");
        }
        println!(
            "Generated {} playlists in {}",
            results.len(),
            output_dir.display()
        );
        return Ok(());
    }

    let Some(tag) = tag else {
        anyhow::bail!("a tag is required (or use --all / --list)");
    };

    let safe_name = tag.replace(['/', '\\'], "-");
    let path = output_dir.join(format!("{safe_name}.m3u"));
    let count = generate_playlist(&db, &tag, &path)?;

    if count == 0 {
        println!("No tracks found for tag '{tag}'.");
    } else {
        println!("Wrote {} ({count} tracks)", path.display());
    }
    Ok(())
}
