use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;
use tokio_util::sync::CancellationToken;

use epaper::cli::{CatalogCommand, Cli, Command};
use epaper::config::AppConfig;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.global.config.as_deref()).context("load config")?;
    cli.global.apply(&mut config);
    config.validate().context("validate config")?;

    epaper::logging::init(cli.global.verbose, config.log_file.as_deref())
        .context("init logging")?;
    tracing::debug!(?cli, "parsed cli");
    tracing::debug!(?config, "effective config");

    match cli.command {
        Command::Download(args) => {
            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("interrupt received; stopping after the current request");
                    on_signal.cancel();
                }
            });
            epaper::commands::download(args, &config, &cancel)
                .await
                .context("download")?;
        }
        Command::Catalog {
            command: CatalogCommand::Publications,
        } => {
            epaper::commands::publications(&config)
                .await
                .context("catalog publications")?;
        }
        Command::Catalog {
            command: CatalogCommand::Editions(args),
        } => {
            epaper::commands::editions(args, &config)
                .await
                .context("catalog editions")?;
        }
        Command::Dates => epaper::commands::dates(),
        Command::Cached => epaper::commands::cached(&config).context("cached")?,
    }

    Ok(())
}
