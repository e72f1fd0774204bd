//! Automatic cart filling for very low mintage IPZS coins.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use chrono::{NaiveDate, TimeDelta};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::browser::Browser;
use crate::config::{Credentials, IPZS_CHECKOUT_URL};
use crate::ipzs::Coin;
use crate::state;
use crate::telegram::Notifier;

/// Days before the same product may be carted again.
const COOLDOWN_DAYS: i64 = 30;

pub type FlashLog = BTreeMap<String, String>;

pub fn candidates(coins: &[Coin], threshold: u64) -> Vec<&Coin> {
    coins
        .iter()
        .filter(|c| matches!(c.mintage(), Some(m) if m <= threshold))
        .filter(|c| !c.is_sold_out())
        .collect()
}

/// A product is due when never carted, when its log entry is unreadable, or
/// when the last attempt is at least the cooldown old.
pub fn is_due(log: &FlashLog, url: &str, today: NaiveDate) -> bool {
    let Some(last) = log.get(url) else {
        return true;
    };
    match NaiveDate::parse_from_str(last, "%Y-%m-%d") {
        Ok(last) => today - last >= TimeDelta::days(COOLDOWN_DAYS),
        Err(_) => {
            warn!(%url, entry = %last, "unreadable flash log date");
            true
        }
    }
}

pub fn checkout_message(names: &[String], threshold: u64) -> String {
    let lines: Vec<String> = names.iter().map(|n| format!("- {n}")).collect();
    format!(
        "<b>Flash-cart IPZS!</b>\nAggiunte al carrello (tiratura ≤ {threshold}):\n{}\n\n➡️ <a href=\"{IPZS_CHECKOUT_URL}\">Vai al checkout IPZS</a>",
        lines.join("\n"),
    )
}

pub struct FlashRun<'a, N> {
    pub notifier: &'a N,
    pub webdriver_url: &'a str,
    pub login: Option<&'a Credentials>,
    pub log_path: &'a Path,
    pub threshold: u64,
    pub today: NaiveDate,
}

impl<N: Notifier> FlashRun<'_, N> {
    pub async fn run(&self, coins: &[Coin]) {
        let picked = candidates(coins, self.threshold);
        info!(
            candidates = ?picked.iter().map(|c| c.url.as_str()).collect::<Vec<_>>(),
            threshold = self.threshold,
            "flash-cart candidates"
        );
        if picked.is_empty() {
            return;
        }
        let Some(login) = self.login else {
            warn!("no IPZS credentials configured, skipping flash-cart");
            return;
        };

        let mut log: FlashLog = state::load_json(self.log_path);
        let browser = match Browser::launch(self.webdriver_url).await {
            Ok(browser) => browser,
            Err(e) => {
                warn!(error = %e, "could not start browser, skipping flash-cart");
                return;
            }
        };
        if !browser.login_ipzs(login).await {
            browser.quit().await;
            return;
        }

        let mut added = Vec::new();
        for coin in picked {
            if !is_due(&log, &coin.url, self.today) {
                info!(url = %coin.url, "flash-cart skipped, carted recently");
                continue;
            }
            if browser.add_to_cart_ipzs(&coin.url).await {
                added.push(coin.name.clone());
                log.insert(coin.url.clone(), self.today.to_string());
            }
            sleep(Duration::from_secs(1)).await;
        }
        browser.quit().await;

        save_log(self.log_path, &log);

        if added.is_empty() {
            info!("flash-cart added nothing");
        } else {
            self.notifier.send(&checkout_message(&added, self.threshold)).await;
        }
    }
}

/// Carts are already filled here; a failed write only loses the cooldown.
fn save_log(path: &Path, log: &FlashLog) -> bool {
    match state::save_json(path, log) {
        Ok(()) => true,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not save flash log");
            false
        }
    }
}
