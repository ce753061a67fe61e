use std::path::PathBuf;

use anyhow::{Context, Result};

pub fn credential_file_path() -> Result<PathBuf> {
    let base = dirs::config_dir().context("unable to resolve config directory")?;
    Ok(base.join("bangumi").join("auth.yaml"))
}

pub fn log_file_path() -> Result<PathBuf> {
    let base = dirs::data_dir().context("unable to resolve data directory")?;
    Ok(base.join("bangumi").join("bgm.log"))
}
