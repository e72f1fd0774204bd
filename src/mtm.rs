//! MTM Monaco (OpenCart) watcher: new products go straight into the cart of
//! every configured account.

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use scraper::{Html, Selector};
use tokio::time::sleep;
use tracing::{info, warn};
use url::Url;

use crate::browser::Browser;
use crate::config::{MTM_CART_URL, MTM_ROOT, MtmAccount};
use crate::error::Result;
use crate::html::{href_from_selectors, resolve_href, text_from_selectors};
use crate::http::PageSource;
use crate::state;
use crate::telegram::Notifier;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub title: String,
    pub price: String,
    pub url: String,
}

pub fn category_links(html: &str, base_url: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let (Ok(base), Ok(anchor)) = (Url::parse(base_url), Selector::parse("a[href]")) else {
        return Vec::new();
    };

    let mut categories: Vec<String> = Vec::new();
    for href in document.select(&anchor).filter_map(|a| a.value().attr("href")) {
        if !href.contains("product/category") {
            continue;
        }
        if let Some(url) = resolve_href(&base, href).map(String::from) {
            if !categories.contains(&url) {
                categories.push(url);
            }
        }
    }
    categories
}

pub fn scrape_listings(html: &str, base_url: &str) -> Vec<Listing> {
    let document = Html::parse_document(html);
    let (Ok(base), Ok(thumb)) = (Url::parse(base_url), Selector::parse(".product-thumb")) else {
        return Vec::new();
    };

    document
        .select(&thumb)
        .filter_map(|block| {
            let href = href_from_selectors(block, &["a[href]"]);
            let title = text_from_selectors(block, &["h4"]);
            if href.is_empty() || title.is_empty() {
                return None;
            }
            let price = text_from_selectors(block, &[".price"]);
            Some(Listing {
                title,
                price: if price.is_empty() { "N/D".to_string() } else { price },
                url: resolve_href(&base, &href)?.into(),
            })
        })
        .collect()
}

pub fn cart_message(titles: &[String]) -> String {
    let mut msg = String::from("<b>Flash monete Monaco!</b>\nSono state aggiunte al carrello:\n");
    for title in titles {
        msg.push_str(&format!("- {title}\n"));
    }
    msg.push_str(&format!("\n➡️ <a href=\"{MTM_CART_URL}\">Vai al checkout MTM Monaco</a>"));
    msg
}

/// Walks every category and returns listings not in `seen`, marking them seen.
pub async fn discover<S: PageSource>(source: &S, seen: &mut BTreeSet<String>) -> Vec<Listing> {
    let Some(home) = source.fetch(MTM_ROOT).await else {
        warn!("MTM home page unavailable");
        return Vec::new();
    };
    let categories = category_links(&home, MTM_ROOT);
    info!(categories = categories.len(), "MTM categories found");

    let mut fresh = Vec::new();
    for (i, url) in categories.iter().enumerate() {
        info!(%url, n = i + 1, of = categories.len(), "fetching MTM category");
        let Some(html) = source.fetch(url).await else {
            continue;
        };
        for listing in scrape_listings(&html, url) {
            if seen.insert(listing.url.clone()) {
                fresh.push(listing);
            }
        }
    }
    fresh
}

pub struct MtmRun<'a, S, N> {
    pub source: &'a S,
    pub notifier: &'a N,
    pub accounts: &'a [MtmAccount],
    pub webdriver_url: &'a str,
    pub seen_path: &'a Path,
    pub cart_enabled: bool,
}

impl<S: PageSource, N: Notifier> MtmRun<'_, S, N> {
    pub async fn run(&self) -> Result<()> {
        let mut seen = state::load_lines(self.seen_path);
        info!(seen = seen.len(), "checking MTM Monaco");

        let fresh = discover(self.source, &mut seen).await;
        if fresh.is_empty() {
            info!("no new MTM products");
            return Ok(());
        }
        info!(new = fresh.len(), "new MTM products");

        if self.cart_enabled {
            let added = self.fill_carts(&fresh).await;
            if !added.is_empty() {
                self.notifier.send(&cart_message(&added)).await;
            }
        }

        state::save_lines(self.seen_path, &seen)
    }

    async fn fill_carts(&self, fresh: &[Listing]) -> Vec<String> {
        let mut added = Vec::new();
        for account in self.accounts {
            let Some(login) = &account.credentials else {
                warn!(account = %account.label, "MTM credentials missing, skipping account");
                continue;
            };
            let browser = match Browser::launch(self.webdriver_url).await {
                Ok(browser) => browser,
                Err(e) => {
                    warn!(error = %e, "could not start browser");
                    continue;
                }
            };
            if browser.login_mtm(login).await {
                for listing in fresh {
                    info!(
                        account = %login.username,
                        title = %listing.title,
                        price = %listing.price,
                        "adding to cart"
                    );
                    if browser.add_to_cart_mtm(&listing.url).await {
                        added.push(listing.title.clone());
                    }
                    sleep(Duration::from_secs(1)).await;
                }
            }
            browser.quit().await;
        }
        added
    }
}
