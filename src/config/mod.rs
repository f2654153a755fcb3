pub mod directory;
pub mod toml_config;

pub use directory::ConfigDirectory;
pub use toml_config::EtlConfig;

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "posting-etl")]
#[command(about = "Fetch assembly postings for a warehouse and append them to the task sheet")]
pub struct CliConfig {
    #[arg(long, short = 'c', default_value = "posting-etl.toml")]
    pub config: PathBuf,

    #[arg(long, short = 'w', help = "Warehouse name as listed in [[warehouses]]")]
    pub warehouse: String,

    #[arg(long, help = "Refuse to run unless this chat id may access the warehouse")]
    pub chat_id: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[arg(long, help = "Also append logs to this file")]
    pub log_file: Option<PathBuf>,

    #[arg(long, help = "Fetch and sort only, do not write to the sheet")]
    pub dry_run: bool,
}

#[cfg(feature = "cli")]
impl crate::utils::validation::Validate for CliConfig {
    fn validate(&self) -> crate::utils::error::Result<()> {
        crate::utils::validation::validate_non_empty_string("warehouse", &self.warehouse)?;
        if let Some(chat_id) = &self.chat_id {
            crate::utils::validation::validate_non_empty_string("chat_id", chat_id)?;
        }
        if let Some(log_file) = &self.log_file {
            crate::utils::validation::validate_path("log_file", &log_file.to_string_lossy())?;
        }
        Ok(())
    }
}
