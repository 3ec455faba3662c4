//! `deskmate init` — Write a default config file.

use std::path::Path;

use deskmate_config::AppConfig;

pub fn run(config_path: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    if config_path.exists() && !force {
        println!("  Config already exists: {}", config_path.display());
        println!("  Use --force to overwrite it.");
        return Ok(());
    }

    if let Some(dir) = config_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }

    std::fs::write(config_path, AppConfig::default_toml())?;
    println!("✅ Wrote {}", config_path.display());
    println!();
    println!("Next steps:");
    println!("  1. Set provider.api_key (or export GROQ_API_KEY)");
    println!("  2. deskmate doctor");
    println!("  3. deskmate serve");

    Ok(())
}
