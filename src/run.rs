use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use chrono::NaiveDateTime;
use tokio::time::sleep;
use tracing::info;

use crate::alerts;
use crate::config::{Config, IPZS_DOMAIN};
use crate::error::Result;
use crate::flash::FlashRun;
use crate::http::PageSource;
use crate::ipzs::{self, Coin};
use crate::mtm::MtmRun;
use crate::spider::{self, Limits};
use crate::state;
use crate::telegram::Notifier;

const PRODUCT_PACING: Duration = Duration::from_millis(150);

/// One complete polling pass over IPZS and MTM Monaco. `now` is local wall-clock time.
pub async fn run<S: PageSource, N: Notifier>(
    config: &Config,
    source: &S,
    notifier: &N,
    now: NaiveDateTime,
) -> Result<()> {
    let paths = &config.state;

    let mut seen = state::load_lines(&paths.seen);
    let mut alerted = state::load_lines(&paths.low_alerts);
    let mut dates: BTreeMap<String, String> = state::load_json(&paths.date_alerts);

    let coins = collect_coins(config, source, now).await?;
    info!(coins = coins.len(), "IPZS catalog scraped");

    alerts::notify_new(notifier, &coins, &mut seen).await;
    alerts::notify_low(notifier, &coins, config.low_mintage, &mut alerted).await;
    alerts::notify_dates(notifier, &coins, now, &mut dates).await;

    // Alerts already went out, so record them before any browser work.
    state::save_lines(&paths.seen, &seen)?;
    state::save_lines(&paths.low_alerts, &alerted)?;
    state::save_json(&paths.date_alerts, &dates)?;

    if config.cart_enabled {
        FlashRun {
            notifier,
            webdriver_url: &config.webdriver_url,
            login: config.ipzs_login.as_ref(),
            log_path: &paths.flash_log,
            threshold: config.flash_mintage,
            today: now.date(),
        }
        .run(&coins)
        .await;
    }
    alerts::sunday_ping(notifier, now).await;

    MtmRun {
        source,
        notifier,
        accounts: &config.mtm_accounts,
        webdriver_url: &config.webdriver_url,
        seen_path: &paths.mtm_seen,
        cart_enabled: config.cart_enabled,
    }
    .run()
    .await
}

async fn collect_coins<S: PageSource>(config: &Config, source: &S, now: NaiveDateTime) -> Result<Vec<Coin>> {
    let mut links: BTreeSet<String> = BTreeSet::new();
    for url in &config.category_urls {
        if let Some(html) = source.fetch(url).await {
            links.extend(ipzs::product_links(&html));
        }
    }
    info!(links = links.len(), "IPZS category links collected");

    if spider::spider_allowed(now, &config.state.spider_lock)? {
        let limits = Limits {
            max_urls: config.spider_max_urls,
            max_depth: config.spider_max_depth,
        };
        links.extend(spider::crawl(source, &config.category_urls, IPZS_DOMAIN, limits).await);
    }

    let mut coins = Vec::new();
    for link in &links {
        if let Some(coin) = source.fetch(link).await.and_then(|html| ipzs::scrape_coin(&html, link)) {
            coins.push(coin);
        }
        sleep(PRODUCT_PACING).await;
    }
    Ok(coins)
}
