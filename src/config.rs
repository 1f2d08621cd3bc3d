//! Configuration module for stagediff
//!
//! Loads user configuration from ~/.stagediff/config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub syntax_highlighting: bool,
    /// Syntax theme name (syntect/bat theme)
    pub syntax_theme: Option<String>,
    /// Context lines requested from git diff; large enough to show whole files
    pub context_lines: u32,
    /// Spaces substituted for each tab in diff content
    pub tab_width: usize,
    /// Share of the screen width given to the file tree
    pub tree_width_percent: u16,
    /// error, warn, info, debug or trace
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            syntax_highlighting: true,
            syntax_theme: None,
            context_lines: 100_000,
            tab_width: 3,
            tree_width_percent: 20,
            log_level: None,
        }
    }
}

impl Config {
    /// Load configuration from default path (~/.stagediff/config.toml)
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load configuration from a specific file, falling back to defaults if absent
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".stagediff")
            .join("config.toml")
    }

    /// Merge CLI overrides into config
    pub fn with_overrides(
        mut self,
        no_syntax: bool,
        theme: Option<String>,
        context_lines: Option<u32>,
    ) -> Self {
        if no_syntax {
            self.syntax_highlighting = false;
        }
        if theme.is_some() {
            self.syntax_theme = theme;
        }
        if let Some(ctx) = context_lines {
            self.context_lines = ctx;
        }
        self
    }

    /// Tree width clamped to a usable range
    pub fn tree_width(&self) -> u16 {
        self.tree_width_percent.clamp(10, 80)
    }

    /// Create a default config file at `path`
    pub fn create_default(path: &Path) -> Result<()> {
        let config = Config::default();

        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let contents = toml::to_string_pretty(&config).context("Failed to serialize config")?;

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}
