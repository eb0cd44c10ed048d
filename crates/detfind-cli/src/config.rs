//! Configuration loading from TOML files.
//!
//! Lookup order:
//! 1. `$DETFIND_CONFIG` environment variable
//! 2. `~/.config/detfind/config.toml`
//! 3. Built-in defaults (everything is optional)

use std::fmt;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use detfind_core::{ParserOptions, MAX_SIZE};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub parser: ParserConfig,
    pub output: OutputConfig,
    pub report: ReportConfig,
}

/// Matrix parsing settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Largest accepted header digit (1-8).
    pub max_size: usize,
}

/// Output file settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Create missing parent directories of the output path.
    pub create_dirs: bool,
}

/// Summary printed after a run.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub format: SummaryFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryFormat {
    #[default]
    None,
    Text,
    Json,
}

impl fmt::Display for SummaryFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

// --- Defaults ---

impl Default for ParserConfig {
    fn default() -> Self {
        Self { max_size: MAX_SIZE }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { create_dirs: true }
    }
}

impl Config {
    pub fn parser_options(&self) -> ParserOptions {
        ParserOptions {
            max_size: self.parser.max_size,
        }
    }

    fn validate(&self) -> Result<()> {
        if !(1..=MAX_SIZE).contains(&self.parser.max_size) {
            bail!(
                "parser.max_size must be between 1 and {MAX_SIZE}, got {}",
                self.parser.max_size
            );
        }
        Ok(())
    }
}

/// Load config from disk. Returns defaults if no config file exists.
pub fn load_config() -> Result<Config> {
    let path = config_path();

    if let Some(p) = &path {
        if p.exists() {
            let content =
                std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))?;
            let config = parse_config(&content).with_context(|| format!("parsing {}", p.display()))?;
            return Ok(config);
        }
    }

    Ok(Config::default())
}

fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Resolve the config file path.
fn config_path() -> Option<PathBuf> {
    // 1. Environment variable
    if let Ok(p) = std::env::var("DETFIND_CONFIG") {
        return Some(PathBuf::from(p));
    }

    // 2. ~/.config/detfind/config.toml
    if let Some(home) = dirs_home() {
        let p = home.join(".config").join("detfind").join("config.toml");
        return Some(p);
    }

    None
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

/// Show the active config path (for `detfind config`).
pub fn show_config_path() -> String {
    match config_path() {
        Some(p) if p.exists() => format!("{} (loaded)", p.display()),
        Some(p) => format!("{} (not found, using defaults)", p.display()),
        None => "no config path resolved (using defaults)".into(),
    }
}
