//! Default locations for persisted state, logs and exported output.

use anyhow::{Context, Result};
use std::path::PathBuf;

const APP_DIR: &str = "openocd-launcher";

fn config_base() -> Result<PathBuf> {
    let base = dirs::config_dir().context("could not determine config directory")?;
    Ok(base.join(APP_DIR))
}

fn data_base() -> Result<PathBuf> {
    let base = dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .context("could not determine data directory")?;
    Ok(base.join(APP_DIR))
}

/// `<config dir>/openocd-launcher/configs.json`
pub fn default_store_path() -> Result<PathBuf> {
    Ok(config_base()?.join("configs.json"))
}

/// `<data dir>/openocd-launcher/launcher.log`
pub fn default_log_path() -> Result<PathBuf> {
    Ok(data_base()?.join("launcher.log"))
}

/// Directory for output captures written from the TUI.
pub fn output_log_dir() -> Result<PathBuf> {
    Ok(data_base()?.join("output"))
}
