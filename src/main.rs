mod alerts;
mod browser;
mod cli;
mod config;
mod error;
mod flash;
mod html;
mod http;
mod ipzs;
mod mtm;
mod run;
mod spider;
mod state;
mod telegram;

use anyhow::{Context, bail};
use chrono::Local;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, LogFormat};
use crate::config::Config;
use crate::http::HttpClient;
use crate::telegram::Telegram;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Credentials usually live in a local .env next to the state files.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.options.log_format);

    let config = Config::from_options(&cli.options).context("invalid configuration")?;
    let http = HttpClient::new().context("failed to create HTTP client")?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            info!(state_dir = %cli.options.state_dir.display(), "start");
            let telegram = Telegram::new(http.inner().clone(), config.telegram.clone());
            run::run(&config, &http, &telegram, Local::now().naive_local()).await?;
            info!("end");
        }
        Command::FlashMtm { url } => {
            let Some(login) = config
                .mtm_accounts
                .first()
                .and_then(|account| account.credentials.as_ref())
            else {
                bail!("MTM_USERNAME and MTM_PASSWORD must be set");
            };
            if browser::flash_purchase_mtm(&config.webdriver_url, login, &url).await? {
                info!(%url, "flash purchase flow completed");
            } else {
                bail!("flash purchase flow failed for {url}");
            }
        }
    }
    Ok(())
}
