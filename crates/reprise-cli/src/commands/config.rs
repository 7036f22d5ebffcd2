use anyhow::Result;

use reprise_fetch::config::{config_file_path, ensure_config_file, Config};

pub fn show_config(config: &Config, init: bool) -> Result<()> {
    if init {
        let path = config_file_path();
        if ensure_config_file()? {
            println!("Wrote starter config to {}", path.display());
        } else {
            println!("Config file already exists at {}", path.display());
        }
        return Ok(());
    }

    println!("Config file:     {}", config_file_path().display());
    println!("Music directory: {}", config.music_dir.display());
    println!("Library index:   {}", config.database_path.display());
    println!("Extensions:      {}", config.audio_extensions.join(", "));
    Ok(())
}
