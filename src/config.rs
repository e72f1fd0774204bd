use std::path::{Path, PathBuf};

use url::Url;

use crate::cli::Options;
use crate::error::{Error, Result};

pub const IPZS_DOMAIN: &str = "www.shop.ipzs.it";
pub const IPZS_CATEGORY_BASE: &str =
    "https://www.shop.ipzs.it/it/catalog/category/view/s/monete/id/3/";
pub const IPZS_LOGIN_URL: &str = "https://www.shop.ipzs.it/it/customer/account/login/";
pub const IPZS_CHECKOUT_URL: &str = "https://www.shop.ipzs.it/it/checkout/";

pub const MTM_ROOT: &str = "https://www.mtm-monaco.mc/index.php?route=common/home";
pub const MTM_LOGIN_URL: &str = "https://www.mtm-monaco.mc/index.php?route=account/login";
pub const MTM_CART_URL: &str = "https://www.mtm-monaco.mc/index.php?route=checkout/cart";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    fn pair(username: Option<&str>, password: Option<&str>) -> Option<Self> {
        match (username, password) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Some(Self {
                username: u.to_string(),
                password: p.to_string(),
            }),
            _ => None,
        }
    }
}

/// One MTM account slot. `credentials` is `None` when the slot is not fully configured.
#[derive(Debug, Clone)]
pub struct MtmAccount {
    pub label: String,
    pub credentials: Option<Credentials>,
}

#[derive(Debug, Clone)]
pub struct Telegram {
    pub api_url: Url,
    pub token: Option<String>,
    pub chat_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub state: StatePaths,
    pub telegram: Telegram,
    pub webdriver_url: String,
    pub cart_enabled: bool,
    pub ipzs_login: Option<Credentials>,
    pub mtm_accounts: Vec<MtmAccount>,
    pub category_urls: Vec<String>,
    pub low_mintage: u64,
    pub flash_mintage: u64,
    pub spider_max_urls: usize,
    pub spider_max_depth: usize,
}

impl Config {
    pub fn from_options(opts: &Options) -> Result<Self> {
        let api_url = Url::parse(&opts.telegram_api_url).map_err(|source| Error::Url {
            url: opts.telegram_api_url.clone(),
            source,
        })?;
        Url::parse(&opts.webdriver_url).map_err(|source| Error::Url {
            url: opts.webdriver_url.clone(),
            source,
        })?;

        let password = opts.mtm_password.as_deref();
        let mtm_accounts = [&opts.mtm_username, &opts.mtm_username_altern]
            .into_iter()
            .map(|user| MtmAccount {
                label: user.clone().unwrap_or_else(|| "<unset>".to_string()),
                credentials: Credentials::pair(user.as_deref(), password),
            })
            .collect();

        // IPZS shares the primary MTM login unless its own is configured.
        let ipzs_login = Credentials::pair(opts.ipzs_username.as_deref(), opts.ipzs_password.as_deref())
            .or_else(|| Credentials::pair(opts.mtm_username.as_deref(), password));

        Ok(Self {
            state: StatePaths::new(&opts.state_dir),
            telegram: Telegram {
                api_url,
                token: non_empty(&opts.telegram_token),
                chat_id: non_empty(&opts.chat_id),
            },
            webdriver_url: opts.webdriver_url.clone(),
            cart_enabled: !opts.no_cart,
            ipzs_login,
            mtm_accounts,
            category_urls: category_urls(opts.ipzs_pages),
            low_mintage: opts.low_mintage,
            flash_mintage: opts.flash_mintage,
            spider_max_urls: opts.spider_max_urls,
            spider_max_depth: opts.spider_max_depth,
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

pub fn category_urls(pages: u32) -> Vec<String> {
    (1..=pages)
        .map(|page| format!("{IPZS_CATEGORY_BASE}?p={page}"))
        .collect()
}

#[derive(Debug, Clone)]
pub struct StatePaths {
    pub seen: PathBuf,
    pub low_alerts: PathBuf,
    pub date_alerts: PathBuf,
    pub spider_lock: PathBuf,
    pub flash_log: PathBuf,
    pub mtm_seen: PathBuf,
}

impl StatePaths {
    pub fn new(dir: &Path) -> Self {
        Self {
            seen: dir.join("seen.txt"),
            low_alerts: dir.join("low_mintage_alerts.txt"),
            date_alerts: dir.join("date_alerts.json"),
            spider_lock: dir.join("last_spider.json"),
            flash_log: dir.join("ipzs_flash_log.json"),
            mtm_seen: dir.join("seen_mtm.txt"),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    fn options(args: &[&str]) -> Options {
        let mut argv = vec!["coinwatch"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().options
    }

    #[test]
    fn builds_five_category_pages() {
        let urls = category_urls(5);
        assert_eq!(urls.len(), 5);
        assert_eq!(
            urls[0],
            "https://www.shop.ipzs.it/it/catalog/category/view/s/monete/id/3/?p=1"
        );
        assert!(urls[4].ends_with("?p=5"));
    }

    #[test]
    fn mtm_accounts_share_the_password() {
        let config = Config::from_options(&options(&[
            "--mtm-username",
            "alice",
            "--mtm-username-altern",
            "bob",
            "--mtm-password",
            "pw",
        ]))
        .unwrap();

        let logins: Vec<_> = config
            .mtm_accounts
            .iter()
            .filter_map(|a| a.credentials.clone())
            .map(|c| (c.username, c.password))
            .collect();
        assert_eq!(
            logins,
            vec![
                ("alice".to_string(), "pw".to_string()),
                ("bob".to_string(), "pw".to_string())
            ]
        );
    }

    #[test]
    fn ipzs_login_falls_back_to_primary_mtm_account() {
        let config = Config::from_options(&options(&[
            "--mtm-username",
            "alice",
            "--mtm-password",
            "pw",
        ]))
        .unwrap();
        let login = config.ipzs_login.unwrap();
        assert_eq!(login.username, "alice");
    }

    #[test]
    fn rejects_malformed_webdriver_url() {
        let result = Config::from_options(&options(&["--webdriver-url", "not a url"]));
        assert!(matches!(result, Err(Error::Url { .. })));
    }

    #[test]
    fn state_files_live_in_state_dir() {
        let paths = StatePaths::new(Path::new("/var/lib/coinwatch"));
        assert_eq!(paths.seen, PathBuf::from("/var/lib/coinwatch/seen.txt"));
        assert_eq!(
            paths.flash_log,
            PathBuf::from("/var/lib/coinwatch/ipzs_flash_log.json")
        );
    }
}
