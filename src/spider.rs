//! Bounded breadth-first crawl of the IPZS shop, used to find products
//! that are not linked from the category pages.

use std::collections::{HashSet, VecDeque};
use std::path::Path;

use chrono::{NaiveDateTime, TimeDelta, Timelike};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::error::Result;
use crate::html::resolve_href;
use crate::http::PageSource;
use crate::ipzs::is_product_page;
use crate::state;

const RUN_HOURS: [u32; 2] = [7, 19];
const SKIPPED_EXTENSIONS: [&str; 3] = [".jpg", ".png", ".pdf"];

#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub max_urls: usize,
    pub max_depth: usize,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SpiderLock {
    pub ts: Option<NaiveDateTime>,
}

/// True when `now` falls in a crawl hour and the previous crawl is at least an
/// hour old. A granted slot is recorded in the lock file.
pub fn spider_allowed(now: NaiveDateTime, lock_path: &Path) -> Result<bool> {
    if !RUN_HOURS.contains(&now.hour()) {
        return Ok(false);
    }
    let lock: SpiderLock = state::load_json(lock_path);
    if let Some(last) = lock.ts {
        if now - last < TimeDelta::hours(1) {
            debug!(%last, "spider ran less than an hour ago");
            return Ok(false);
        }
    }
    state::save_json(lock_path, &SpiderLock { ts: Some(now) })?;
    Ok(true)
}

/// Crawls from `start`, staying on `domain`. Returns the product pages found.
pub async fn crawl<S: PageSource>(
    source: &S,
    start: &[String],
    domain: &str,
    limits: Limits,
) -> Vec<String> {
    let mut queue: VecDeque<(String, usize)> = start.iter().map(|u| (u.clone(), 0)).collect();
    let mut visited: HashSet<String> = HashSet::new();
    let mut products = Vec::new();

    while visited.len() < limits.max_urls {
        let Some((url, depth)) = queue.pop_front() else {
            break;
        };
        if depth > limits.max_depth || visited.contains(&url) {
            continue;
        }
        visited.insert(url.clone());

        let Some(html) = source.fetch(&url).await else {
            continue;
        };
        match expand(&html, &url, domain) {
            Page::Product => products.push(url),
            Page::Links(links) => queue.extend(
                links
                    .into_iter()
                    .filter(|link| !visited.contains(link))
                    .map(|link| (link, depth + 1)),
            ),
        }
    }

    info!(visited = visited.len(), products = products.len(), "spider finished");
    products
}

enum Page {
    Product,
    Links(Vec<String>),
}

fn expand(html: &str, page_url: &str, domain: &str) -> Page {
    let document = Html::parse_document(html);
    if is_product_page(&document) {
        return Page::Product;
    }
    let (Ok(base), Ok(anchor)) = (Url::parse(page_url), Selector::parse("a[href]")) else {
        return Page::Links(Vec::new());
    };

    let links = document
        .select(&anchor)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| resolve_href(&base, href))
        .filter(|url| url.host_str() == Some(domain))
        .map(String::from)
        .filter(|url| !SKIPPED_EXTENSIONS.iter().any(|ext| url.ends_with(ext)))
        .collect();
    Page::Links(links)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::http::testing::StubSite;

    const DOMAIN: &str = "www.shop.ipzs.it";

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn product(name: &str) -> String {
        format!(r#"<h1 class="page-title"><span class="base">{name}</span></h1>"#)
    }

    fn limits(max_urls: usize, max_depth: usize) -> Limits {
        Limits { max_urls, max_depth }
    }

    #[test]
    fn only_runs_in_crawl_hours() {
        let dir = tempfile::tempdir().unwrap();
        let lock = dir.path().join("last_spider.json");
        assert!(!spider_allowed(at(8, 0), &lock).unwrap());
        assert!(!lock.exists());
        assert!(spider_allowed(at(7, 5), &lock).unwrap());
        assert!(lock.exists());
    }

    #[test]
    fn lock_blocks_a_second_run_within_the_hour() {
        let dir = tempfile::tempdir().unwrap();
        let lock = dir.path().join("last_spider.json");
        assert!(spider_allowed(at(19, 0), &lock).unwrap());
        assert!(!spider_allowed(at(19, 59), &lock).unwrap());

        let saved: SpiderLock = state::load_json(&lock);
        assert_eq!(saved.ts, Some(at(19, 0)));
    }

    #[test]
    fn old_lock_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let lock = dir.path().join("last_spider.json");
        assert!(spider_allowed(at(7, 0), &lock).unwrap());
        assert!(spider_allowed(at(19, 0), &lock).unwrap());
        let saved: SpiderLock = state::load_json(&lock);
        assert_eq!(saved.ts, Some(at(19, 0)));
    }

    #[tokio::test]
    async fn finds_products_without_expanding_them() {
        let site = StubSite::default()
            .page(
                "https://www.shop.ipzs.it/it/",
                r##"<a href="/it/monete.html">Monete</a>
                   <a href="https://www.shop.ipzs.it/it/dante.html#top">Dante</a>
                   <a href="https://elsewhere.test/x">off site</a>
                   <a href="/media/catalogo.pdf">pdf</a>
                   <a href="/img/moneta.jpg">jpg</a>"##,
            )
            .page(
                "https://www.shop.ipzs.it/it/monete.html",
                r#"<a href="/it/verdi.html">Verdi</a><a href="/it/">home</a>"#,
            )
            .page(
                "https://www.shop.ipzs.it/it/dante.html",
                &(product("Dante") + r#"<a href="/it/never.html">x</a>"#),
            )
            .page("https://www.shop.ipzs.it/it/verdi.html", &product("Verdi"));

        let found = crawl(
            &site,
            &["https://www.shop.ipzs.it/it/".to_string()],
            DOMAIN,
            limits(50, 3),
        )
        .await;

        assert_eq!(
            found,
            vec![
                "https://www.shop.ipzs.it/it/dante.html",
                "https://www.shop.ipzs.it/it/verdi.html"
            ]
        );
        let requests = site.requests.borrow();
        assert!(!requests.iter().any(|u| u.contains("never")));
        assert!(!requests.iter().any(|u| u.ends_with(".pdf") || u.ends_with(".jpg")));
        assert!(!requests.iter().any(|u| u.contains("elsewhere")));
        assert_eq!(requests.iter().filter(|u| u.ends_with("/it/")).count(), 1);
    }

    #[tokio::test]
    async fn respects_depth_limit() {
        let site = StubSite::default()
            .page("https://www.shop.ipzs.it/a", r#"<a href="/b">b</a>"#)
            .page("https://www.shop.ipzs.it/b", r#"<a href="/c">c</a>"#)
            .page("https://www.shop.ipzs.it/c", &product("C"));

        let found = crawl(&site, &["https://www.shop.ipzs.it/a".to_string()], DOMAIN, limits(50, 1)).await;
        assert!(found.is_empty());
        assert_eq!(site.requests.borrow().len(), 2);
    }

    #[tokio::test]
    async fn respects_url_budget() {
        let site = StubSite::default().page(
            "https://www.shop.ipzs.it/",
            r#"<a href="/1">1</a><a href="/2">2</a><a href="/3">3</a><a href="/4">4</a>"#,
        );
        crawl(&site, &["https://www.shop.ipzs.it/".to_string()], DOMAIN, limits(3, 3)).await;
        assert_eq!(site.requests.borrow().len(), 3);
    }

    #[tokio::test]
    async fn failed_fetches_still_count_as_visited() {
        let site = StubSite::default();
        let start = vec![
            "https://www.shop.ipzs.it/x".to_string(),
            "https://www.shop.ipzs.it/x".to_string(),
        ];
        let found = crawl(&site, &start, DOMAIN, limits(10, 3)).await;
        assert!(found.is_empty());
        assert_eq!(site.requests.borrow().len(), 1);
    }
}
