//! `oscfg init` — Write the default config file.

use oscfg_config::AppConfig;
use std::path::Path;

pub fn run(force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = AppConfig::config_path();
    if write_default(&path, force)? {
        println!("✅ Created config: {}", path.display());
    } else {
        println!("  Config exists: {} (use --force to overwrite)", path.display());
    }
    Ok(())
}

/// Write the default config to `path`. Returns `false` when a file is
/// already there and `force` is unset.
pub fn write_default(path: &Path, force: bool) -> Result<bool, std::io::Error> {
    if path.exists() && !force {
        return Ok(false);
    }
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, AppConfig::default_toml())?;
    Ok(true)
}
