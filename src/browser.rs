//! Headless Chrome sessions used to log in and fill shopping carts.

use std::time::Duration;

use thirtyfour::prelude::*;
use thirtyfour::ChromiumLikeCapabilities;
use tokio::time::{Instant, sleep};
use tracing::{info, warn};

use crate::config::{
    Credentials, IPZS_LOGIN_URL, MTM_CART_URL, MTM_LOGIN_URL,
};
use crate::error::{Error, Result};

const WAIT: Duration = Duration::from_secs(10);
const POLL: Duration = Duration::from_millis(250);

pub struct Browser {
    driver: WebDriver,
}

impl Browser {
    pub async fn launch(webdriver_url: &str) -> Result<Self> {
        let mut caps = DesiredCapabilities::chrome();
        caps.set_headless()?;
        caps.set_no_sandbox()?;
        caps.set_disable_dev_shm_usage()?;
        caps.set_disable_gpu()?;
        caps.add_arg("--window-size=1920,1080")?;

        let driver = WebDriver::new(webdriver_url, caps).await?;
        Ok(Self { driver })
    }

    pub async fn quit(self) {
        if let Err(e) = self.driver.quit().await {
            warn!(error = %e, "failed to close browser session");
        }
    }

    async fn wait_for_url(&self, fragment: &str) -> Result<()> {
        let deadline = Instant::now() + WAIT;
        loop {
            if self.driver.current_url().await?.as_str().contains(fragment) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(Error::Timeout(format!("url containing {fragment}")));
            }
            sleep(POLL).await;
        }
    }

    async fn fill(&self, by: By, value: &str) -> Result<()> {
        let input = self.driver.find(by).await?;
        input.clear().await?;
        input.send_keys(value).await?;
        Ok(())
    }

    pub async fn login_ipzs(&self, login: &Credentials) -> bool {
        match self.try_login_ipzs(login).await {
            Ok(()) => {
                info!(user = %login.username, "IPZS login succeeded");
                true
            }
            Err(e) => {
                warn!(user = %login.username, error = %e, "IPZS login failed");
                false
            }
        }
    }

    async fn try_login_ipzs(&self, login: &Credentials) -> Result<()> {
        self.driver.goto(IPZS_LOGIN_URL).await?;
        self.driver
            .query(By::Id("email"))
            .wait(WAIT, POLL)
            .first()
            .await?;
        self.fill(By::Id("email"), &login.username).await?;
        self.fill(By::Id("passw"), &login.password).await?;
        self.driver.find(By::Id("send3")).await?.click().await?;
        self.wait_for_url("/it/customer/account/").await
    }

    pub async fn add_to_cart_ipzs(&self, product_url: &str) -> bool {
        let attempt = async {
            self.driver.goto(product_url).await?;
            self.driver
                .query(By::Id("product-addtocart-button"))
                .wait(WAIT, POLL)
                .first()
                .await?
                .click()
                .await?;
            sleep(Duration::from_secs(1)).await;
            Ok::<_, Error>(())
        };
        report_cart(attempt.await, product_url)
    }

    pub async fn login_mtm(&self, login: &Credentials) -> bool {
        match self.try_login_mtm(login).await {
            Ok(true) => {
                info!(user = %login.username, "MTM login succeeded");
                true
            }
            Ok(false) => {
                warn!(user = %login.username, "MTM login rejected");
                false
            }
            Err(e) => {
                warn!(user = %login.username, error = %e, "MTM login failed");
                false
            }
        }
    }

    async fn try_login_mtm(&self, login: &Credentials) -> Result<bool> {
        self.driver.goto(MTM_LOGIN_URL).await?;
        sleep(Duration::from_secs(1)).await;
        self.fill(By::Name("email"), &login.username).await?;
        self.fill(By::Name("password"), &login.password).await?;
        self.driver
            .find(By::Css("input[type='submit']"))
            .await?
            .click()
            .await?;
        sleep(Duration::from_secs(2)).await;

        let source = self.driver.source().await?.to_lowercase();
        Ok(is_mtm_logged_in(&source))
    }

    /// Adds the product and leaves the session on the cart page.
    pub async fn add_to_cart_mtm(&self, product_url: &str) -> bool {
        let attempt = async {
            self.driver.goto(product_url).await?;
            sleep(Duration::from_secs(1)).await;
            self.driver.find(By::Id("button-cart")).await?.click().await?;
            sleep(Duration::from_secs(1)).await;
            self.driver.goto(MTM_CART_URL).await?;
            Ok::<_, Error>(())
        };
        report_cart(attempt.await, product_url)
    }
}

fn report_cart(result: Result<()>, product_url: &str) -> bool {
    match result {
        Ok(()) => {
            info!(url = %product_url, "added to cart");
            true
        }
        Err(e) => {
            warn!(url = %product_url, error = %e, "could not add to cart");
            false
        }
    }
}

fn is_mtm_logged_in(page_source: &str) -> bool {
    page_source.contains("route=account/logout") || page_source.contains("account/dashboard")
}

/// Single-product MTM flow: new session, login, add to cart.
pub async fn flash_purchase_mtm(webdriver_url: &str, login: &Credentials, product_url: &str) -> Result<bool> {
    let browser = Browser::launch(webdriver_url).await?;
    let ok = browser.login_mtm(login).await && browser.add_to_cart_mtm(product_url).await;
    browser.quit().await;
    Ok(ok)
}
