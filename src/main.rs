use anyhow::{bail, Context};
use app_scaffold::config::cli::Command;
use app_scaffold::utils::{logger, validation::Validate};
use app_scaffold::{CliConfig, Configurator, Lifecycle};
use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting app-scaffold CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let options = cli
        .configurator_options()
        .context("failed to load configurator options")?;
    options.validate().context("invalid configurator options")?;

    // 驗證失敗時預設的 ExitReporter 會以狀態碼 1 結束
    let mut configurator = Configurator::new(options);
    configurator.boot().context("failed to resolve environment")?;

    let Command::Env { key, .. } = &cli.command;
    let output = match key {
        Some(key) => match configurator.get(key) {
            Some(value) => serde_json::to_string_pretty(value)?,
            None => bail!("environment variable '{}' is not set", key),
        },
        None => serde_json::to_string_pretty(configurator.all())?,
    };

    println!("{}", output);
    Ok(())
}
