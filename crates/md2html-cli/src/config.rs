//! Configuration file support for md2html CLI
//!
//! Loads settings from `_md2html.toml` configuration file.

use anyhow::{Context, Result};
use clap::ValueEnum;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "_md2html.toml";

/// Schema URL for the configuration file
pub const SCHEMA_URL: &str =
    "https://raw.githubusercontent.com/md2html/md2html/main/crates/md2html-cli/schema/md2html.schema.json";

/// What a conversion writes out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Emit {
    /// Rendered HTML markup
    #[default]
    Html,
    /// The Markdown tree as JsonML
    Tree,
    /// The HTML tree as JsonML
    HtmlTree,
}

impl Emit {
    /// File extension used for output files when none is configured
    pub fn extension(self) -> &'static str {
        match self {
            Emit::Html => "html",
            Emit::Tree | Emit::HtmlTree => "json",
        }
    }
}

/// Root configuration structure
#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(default)]
pub struct Config {
    /// Parser configuration
    #[serde(skip_serializing_if = "ParserConfig::is_empty")]
    pub parser: ParserConfig,
    /// Output configuration
    #[serde(skip_serializing_if = "OutputConfig::is_empty")]
    pub output: OutputConfig,
}

/// Parser configuration
#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(default)]
pub struct ParserConfig {
    /// Markdown dialect: "Gruber" (alias "default") or "Maruku" (default: "Gruber")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dialect: Option<String>,
    /// Maximum nesting of blockquotes and list item bodies (default: 32)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_block_depth: Option<usize>,
    /// Maximum nesting of emphasis and link text (default: 128)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_inline_depth: Option<usize>,
}

impl ParserConfig {
    fn is_empty(&self) -> bool {
        self.dialect.is_none() && self.max_block_depth.is_none() && self.max_inline_depth.is_none()
    }
}

/// Output configuration
#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(default)]
pub struct OutputConfig {
    /// What to write: "html", "tree" or "html-tree" (default: "html")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emit: Option<Emit>,
    /// Extension of output files (default: "html", or "json" for trees)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    /// Render the root element as an `<html>` wrapper (default: false)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<bool>,
    /// Treat each input as a slide deck split on `-----` lines (default: false)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slides: Option<bool>,
}

impl OutputConfig {
    fn is_empty(&self) -> bool {
        self.emit.is_none()
            && self.extension.is_none()
            && self.root.is_none()
            && self.slides.is_none()
    }
}

impl Config {
    /// Load configuration from a specific file path
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Try to load configuration from a directory (looks for `_md2html.toml`)
    ///
    /// Returns `Ok(None)` if the config file doesn't exist.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Generate JSON schema for the configuration
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Config)
    }

    /// Generate JSON schema as a string
    pub fn json_schema_string() -> Result<String> {
        let schema = Self::json_schema();
        serde_json::to_string_pretty(&schema).context("Failed to serialize JSON schema")
    }

    /// Serialize configuration to TOML string with schema directive
    pub fn to_toml_with_schema(&self) -> Result<String> {
        let toml_content =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        Ok(format!("#:schema {}\n\n{}", SCHEMA_URL, toml_content))
    }

    /// Create a sample configuration with common defaults for init command
    pub fn sample() -> Self {
        Config {
            parser: ParserConfig {
                dialect: Some("Gruber".to_string()),
                max_block_depth: Some(32),
                max_inline_depth: Some(128),
            },
            output: OutputConfig {
                emit: Some(Emit::Html),
                extension: None, // follows emit
                root: Some(false),
                slides: Some(false),
            },
        }
    }
}
