#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_file_exists, validate_file_extension, validate_path, Validate,
};
#[cfg(feature = "cli")]
use clap::Parser;
use serde::{Deserialize, Serialize};
use toml_config::PostSettings;

pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods", "csv"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(Parser))]
#[cfg_attr(feature = "cli", command(name = "affiliate-posts"))]
#[cfg_attr(
    feature = "cli",
    command(about = "Generate Instagram-ready affiliate posts from a product spreadsheet")
)]
pub struct CliConfig {
    #[cfg_attr(feature = "cli", arg(long, help = "Spreadsheet with one product per row"))]
    pub excel: String,

    #[cfg_attr(feature = "cli", arg(long, help = "Directory that receives one folder per product"))]
    pub out: String,

    #[cfg_attr(feature = "cli", arg(long, help = "Worksheet name (defaults to the first sheet)"))]
    pub sheet: Option<String>,

    #[cfg_attr(feature = "cli", arg(long, help = "TOML settings file"))]
    pub config: Option<String>,

    #[cfg_attr(feature = "cli", arg(long, help = "Enable verbose output"))]
    pub verbose: bool,

    #[cfg_attr(feature = "cli", arg(long, help = "Log CPU and memory usage between phases"))]
    pub monitor: bool,

    #[cfg_attr(feature = "cli", arg(long, help = "Emit logs as JSON lines"))]
    pub json_logs: bool,

    #[cfg_attr(feature = "cli", arg(skip))]
    #[serde(default)]
    pub settings: PostSettings,
}

impl CliConfig {
    pub fn new(excel: impl Into<String>, out: impl Into<String>) -> Self {
        Self {
            excel: excel.into(),
            out: out.into(),
            sheet: None,
            config: None,
            verbose: false,
            monitor: false,
            json_logs: false,
            settings: PostSettings::default(),
        }
    }

    /// Loads the `--config` file, if one was given, into `settings`.
    pub fn load_settings(&mut self) -> Result<()> {
        if let Some(path) = &self.config {
            tracing::debug!("Loading settings from {}", path);
            self.settings = PostSettings::from_file(path)?;
        }
        Ok(())
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_file_exists("excel", &self.excel)?;
        validate_file_extension("excel", &self.excel, SPREADSHEET_EXTENSIONS)?;
        validate_path("out", &self.out)?;
        self.settings.validate()
    }
}

impl ConfigProvider for CliConfig {
    fn spreadsheet_path(&self) -> &str {
        &self.excel
    }

    fn sheet_name(&self) -> Option<&str> {
        self.sheet.as_deref()
    }

    fn settings(&self) -> &PostSettings {
        &self.settings
    }
}
