use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "coinwatch",
    version,
    about = "Watches the IPZS coin catalog and MTM Monaco for new or scarce coins"
)]
pub struct Cli {
    #[command(flatten)]
    pub options: Options,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// One polling pass over both shops (the default)
    Run,
    /// Log into MTM Monaco and put a single product in the cart
    FlashMtm { url: String },
}

#[derive(Args, Debug, Clone)]
pub struct Options {
    #[arg(long, global = true, env = "COINWATCH_STATE_DIR", default_value = ".")]
    pub state_dir: PathBuf,

    #[arg(long, global = true, env = "TELEGRAM_TOKEN", hide_env_values = true)]
    pub telegram_token: Option<String>,
    #[arg(long, global = true, env = "CHAT_ID")]
    pub chat_id: Option<String>,
    #[arg(
        long,
        global = true,
        env = "TELEGRAM_API_URL",
        default_value = "https://api.telegram.org"
    )]
    pub telegram_api_url: String,

    #[arg(long, global = true, env = "MTM_USERNAME")]
    pub mtm_username: Option<String>,
    #[arg(long, global = true, env = "MTM_USERNAME_ALTERN")]
    pub mtm_username_altern: Option<String>,
    #[arg(long, global = true, env = "MTM_PASSWORD", hide_env_values = true)]
    pub mtm_password: Option<String>,
    #[arg(long, global = true, env = "IPZS_USERNAME")]
    pub ipzs_username: Option<String>,
    #[arg(long, global = true, env = "IPZS_PASSWORD", hide_env_values = true)]
    pub ipzs_password: Option<String>,

    #[arg(
        long,
        global = true,
        env = "WEBDRIVER_URL",
        default_value = "http://localhost:9515"
    )]
    pub webdriver_url: String,
    #[arg(long, global = true, default_value_t = false, help = "Skip every browser step")]
    pub no_cart: bool,

    #[arg(long, global = true, default_value_t = 5)]
    pub ipzs_pages: u32,
    #[arg(long, global = true, default_value_t = 1500)]
    pub low_mintage: u64,
    #[arg(long, global = true, default_value_t = 500)]
    pub flash_mintage: u64,
    #[arg(long, global = true, default_value_t = 50)]
    pub spider_max_urls: usize,
    #[arg(long, global = true, default_value_t = 3)]
    pub spider_max_depth: usize,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}
