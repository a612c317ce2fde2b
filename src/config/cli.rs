use crate::config::configurator::{ConfiguratorOptions, DEFAULT_ENV_FILE};
use crate::utils::error::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "app-scaffold")]
#[command(about = "Inspect application environment and configuration")]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    pub json_logs: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Resolve the environment and print it as JSON
    Env {
        #[arg(long, default_value = DEFAULT_ENV_FILE)]
        file: PathBuf,

        #[arg(long, help = "Only keep declared variables")]
        strict: bool,

        #[arg(long, help = "TOML file declaring validators")]
        validators: Option<PathBuf>,

        #[arg(long, help = "Print a single variable instead of all of them")]
        key: Option<String>,
    },
}

impl CliConfig {
    /// 命令列參數優先於 TOML 檔案中的設定
    pub fn configurator_options(&self) -> Result<ConfiguratorOptions> {
        let Command::Env {
            file,
            strict,
            validators,
            ..
        } = &self.command;

        let options = match validators {
            Some(path) => ConfiguratorOptions::from_file(path)?,
            None => ConfiguratorOptions::new(),
        };

        let options = options.with_file(file.clone());
        Ok(if *strict { options.strict(true) } else { options })
    }
}
