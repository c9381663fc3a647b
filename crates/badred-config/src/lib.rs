//! Configuration loading: parses `badred.toml` (or a path override from the
//! CLI) into the process-wide [`EditorOptions`], tolerating a missing or
//! unparseable file by falling back to defaults rather than failing boot.

use std::{fs, path::PathBuf};

use anyhow::Result;
use badred_bridge::EditorOptions;
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub options: OptionsSection,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OptionsSection {
    #[serde(default = "OptionsSection::default_tab_width")]
    pub tab_width: u16,
    #[serde(default = "OptionsSection::default_expand_tabs")]
    pub expand_tabs: bool,
}

impl Default for OptionsSection {
    fn default() -> Self {
        Self {
            tab_width: Self::default_tab_width(),
            expand_tabs: Self::default_expand_tabs(),
        }
    }
}

impl OptionsSection {
    const fn default_tab_width() -> u16 {
        4
    }

    const fn default_expand_tabs() -> bool {
        false
    }
}

impl From<OptionsSection> for EditorOptions {
    fn from(section: OptionsSection) -> Self {
        EditorOptions {
            tab_width: section.tab_width,
            expand_tabs: section.expand_tabs,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub file: ConfigFile,
}

impl Config {
    pub fn editor_options(&self) -> EditorOptions {
        self.file.options.clone().into()
    }
}

/// Best-effort config path: a `badred.toml` in the working directory takes
/// priority over the platform config directory.
pub fn discover() -> PathBuf {
    let local = PathBuf::from("badred.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("badred").join("badred.toml");
    }
    PathBuf::from("badred.toml")
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        info!(target: "badred_config", path = %path.display(), "no config file found, using defaults");
        return Ok(Config::default());
    };

    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => {
            info!(target: "badred_config", path = %path.display(), "loaded config");
            Ok(Config { file })
        }
        Err(err) => {
            warn!(target: "badred_config", path = %path.display(), error = %err, "failed to parse config, using defaults");
            Ok(Config::default())
        }
    }
}
