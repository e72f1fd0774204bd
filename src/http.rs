use std::future::Future;
use std::time::Duration;

use reqwest::header::USER_AGENT;
use tracing::warn;

use crate::error::Result;

const BROWSER_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Anything that can hand back the HTML of a page. Failures are `None`.
pub trait PageSource {
    fn fetch(&self, url: &str) -> impl Future<Output = Option<String>>;
}

#[derive(Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Result<Self> {
        let inner = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { inner })
    }

    pub fn inner(&self) -> &reqwest::Client {
        &self.inner
    }
}

impl PageSource for HttpClient {
    async fn fetch(&self, url: &str) -> Option<String> {
        fetch_html(&self.inner, url).await
    }
}

pub async fn fetch_html(client: &reqwest::Client, url: &str) -> Option<String> {
    let response = client
        .get(url)
        .header(USER_AGENT, BROWSER_UA)
        .send()
        .await
        .and_then(|resp| resp.error_for_status());

    match response {
        Ok(resp) => match resp.text().await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(%url, error = %e, "failed to read response body");
                None
            }
        },
        Err(e) => {
            warn!(%url, error = %e, "failed to fetch page");
            None
        }
    }
}
