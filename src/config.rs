use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Defaults for the command-line tool, read from `xrose.toml`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct XRoseConfig {
    /// Document used when a command is given none
    pub document: Option<String>,
    /// Output format: `text` or `json`
    pub format: Option<String>,
}

impl XRoseConfig {
    pub fn document_path(&self) -> Option<PathBuf> {
        self.document.as_ref().map(PathBuf::from)
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("xrose.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<XRoseConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: XRoseConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &XRoseConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

/// Create the parent directory of a document path if needed
pub fn ensure_document_dir(document: &Path) -> anyhow::Result<()> {
    if let Some(parent) = document.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
