pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::{toml_config::PostSettings, CliConfig};

#[cfg(feature = "cli")]
pub use config::cli::LocalStorage;

pub use core::{etl::PostEngine, etl::RunSummary, pipeline::PostPipeline};
pub use domain::model::{PostMeta, PostType, ProductRow};
pub use utils::error::{PostError, Result};
