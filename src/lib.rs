pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use app::{run_warehouse, RunRequest};
pub use config::{ConfigDirectory, EtlConfig};
pub use core::{etl::EtlEngine, pipeline::PostingPipeline};
pub use utils::error::{EtlError, Result};
