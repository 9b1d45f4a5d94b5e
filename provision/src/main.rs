use std::{env, path::PathBuf};

use anyhow::{Context, Result};
use facade_utils::{ensure_default_config, Config};

/// Writes the placeholder routing table, to the path given as first argument
/// or to the one named by the facade configuration.
fn main() -> Result<()> {
    let path = match env::args_os().nth(1) {
        Some(path) => PathBuf::from(path),
        None => {
            Config::load()
                .context("Failed to load facade configuration")?
                .transports
        }
    };

    if ensure_default_config(&path)
        .with_context(|| format!("Failed to provision {}", path.display()))?
    {
        println!("Created routing table at {}", path.display());
    } else {
        println!("Routing table already present at {}", path.display());
    }
    Ok(())
}
