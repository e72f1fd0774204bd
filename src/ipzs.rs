//! IPZS shop catalog: category listings and coin detail pages.

use std::collections::HashMap;

use chrono::NaiveDate;
use scraper::{Html, Selector};

use crate::html::{element_text, text_from_selectors};

pub const PRODUCT_TITLE: &str = "h1.page-title span.base";

const SOLD_OUT: &str = "NON DISPONIBILE";
const IN_STOCK: &str = "DISPONIBILE";
const MISSING: &str = "N/A";

const DATE_FORMATS: [&str; 4] = ["%d %b %Y", "%d %B %Y", "%d/%m/%Y", "%Y-%m-%d"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coin {
    pub url: String,
    pub name: String,
    pub price: String,
    pub availability: String,
    pub mintage: String,
    pub available_from: String,
    pub finish: String,
    pub metal: String,
    pub weight: String,
    pub on_sale_since: String,
}

impl Coin {
    pub fn is_sold_out(&self) -> bool {
        self.availability.to_uppercase().contains(SOLD_OUT)
    }

    pub fn mintage(&self) -> Option<u64> {
        parse_mintage(&self.mintage)
    }

    pub fn release_date(&self) -> Option<NaiveDate> {
        parse_date(&self.available_from)
    }
}

/// Product links from a category page.
pub fn product_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a.product-item-link") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| !href.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn is_product_page(document: &Html) -> bool {
    Selector::parse(PRODUCT_TITLE)
        .map(|selector| document.select(&selector).next().is_some())
        .unwrap_or(false)
}

/// Parses a coin detail page. Pages without a product title element yield
/// `None`; an empty title still makes a coin, same as for the crawler.
pub fn scrape_coin(html: &str, url: &str) -> Option<Coin> {
    let document = Html::parse_document(html);
    if !is_product_page(&document) {
        return None;
    }
    let root = document.root_element();

    let name = text_from_selectors(root, &[PRODUCT_TITLE]);

    let price = or_missing(text_from_selectors(root, &["span.price"]));
    let stock = text_from_selectors(root, &["div.stock"]).to_uppercase();
    let availability = if stock.contains(SOLD_OUT) {
        SOLD_OUT.to_string()
    } else if stock.contains(IN_STOCK) {
        IN_STOCK.to_string()
    } else {
        or_missing(stock)
    };

    let attrs = attribute_table(&document);
    let attr = |keys: &[&str]| {
        keys.iter()
            .filter_map(|k| attrs.get(*k))
            .find(|v| !v.is_empty())
            .cloned()
            .unwrap_or_else(|| MISSING.to_string())
    };

    Some(Coin {
        url: url.to_string(),
        name,
        price,
        availability,
        mintage: attr(&["contingente", "tiratura", "numero pezzi"]),
        available_from: attr(&["data disponibilità", "data disponibilita"]),
        finish: attr(&["finitura"]),
        metal: attr(&["metallo"]),
        weight: attr(&["peso (gr)"]),
        on_sale_since: attr(&["in vendita da"]),
    })
}

fn attribute_table(document: &Html) -> HashMap<String, String> {
    let mut attrs = HashMap::new();
    let (Ok(row), Ok(th), Ok(td)) = (
        Selector::parse("div.product-info-main table.data tr"),
        Selector::parse("th"),
        Selector::parse("td"),
    ) else {
        return attrs;
    };
    for tr in document.select(&row) {
        if let (Some(key), Some(value)) = (tr.select(&th).next(), tr.select(&td).next()) {
            attrs.insert(element_text(key).to_lowercase(), element_text(value));
        }
    }
    attrs
}

fn or_missing(value: String) -> String {
    if value.is_empty() {
        MISSING.to_string()
    } else {
        value
    }
}

/// First integer in a mintage field, ignoring thousands separators: `"1.500 pezzi"` is 1500.
pub fn parse_mintage(text: &str) -> Option<u64> {
    let compact: String = text.chars().filter(|c| *c != '.' && *c != ' ').collect();
    let digits: String = compact
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}


#[cfg(test)]
mod tests {
    use super::*;

    const DETAIL: &str = r#"
        <html><body>
          <h1 class="page-title"><span class="base">  5 Euro Dante Alighieri  </span></h1>
          <div class="product-info-main">
            <div class="price-box"><span class="price">€ 52,00</span></div>
            <div class="stock available"><span>Disponibile</span></div>
            <table class="data table">
              <tr><th>Contingente</th><td>1.500 pezzi</td></tr>
              <tr><th>Data disponibilità</th><td>14/05/2025</td></tr>
              <tr><th>Metallo</th><td>Argento 925</td></tr>
              <tr><th>Peso (gr)</th><td>18</td></tr>
              <tr><td>orphan cell</td></tr>
            </table>
          </div>
        </body></html>"#;

    #[test]
    fn extracts_coin_fields() {
        let coin = scrape_coin(DETAIL, "https://www.shop.ipzs.it/it/dante.html").unwrap();
        assert_eq!(coin.name, "5 Euro Dante Alighieri");
        assert_eq!(coin.price, "€ 52,00");
        assert_eq!(coin.availability, "DISPONIBILE");
        assert_eq!(coin.mintage, "1.500 pezzi");
        assert_eq!(coin.mintage(), Some(1500));
        assert_eq!(coin.available_from, "14/05/2025");
        assert_eq!(coin.release_date(), NaiveDate::from_ymd_opt(2025, 5, 14));
        assert_eq!(coin.metal, "Argento 925");
        assert_eq!(coin.weight, "18");
        assert_eq!(coin.finish, "N/A");
        assert_eq!(coin.on_sale_since, "N/A");
    }

    #[test]
    fn sold_out_wins_over_available() {
        let html = DETAIL.replace("Disponibile", "Non disponibile");
        let coin = scrape_coin(&html, "u").unwrap();
        assert_eq!(coin.availability, "NON DISPONIBILE");
        assert!(coin.is_sold_out());
    }

    #[test]
    fn missing_stock_and_price_default() {
        let html = r#"<h1 class="page-title"><span class="base">Moneta</span></h1>"#;
        let coin = scrape_coin(html, "u").unwrap();
        assert_eq!(coin.price, "N/A");
        assert_eq!(coin.availability, "N/A");
        assert_eq!(coin.mintage, "N/A");
        assert_eq!(coin.mintage(), None);
    }

    #[test]
    fn unknown_stock_text_is_kept_upper_cased() {
        let html = r#"<h1 class="page-title"><span class="base">M</span></h1>
                      <div class="stock">Prossimamente</div>"#;
        assert_eq!(scrape_coin(html, "u").unwrap().availability, "PROSSIMAMENTE");
    }

    #[test]
    fn tiratura_is_used_when_contingente_is_absent() {
        let html = r#"<h1 class="page-title"><span class="base">M</span></h1>
            <div class="product-info-main"><table class="data">
              <tr><th>Tiratura</th><td>800</td></tr>
              <tr><th>Data disponibilita</th><td>2025-06-01</td></tr>
            </table></div>"#;
        let coin = scrape_coin(html, "u").unwrap();
        assert_eq!(coin.mintage(), Some(800));
        assert_eq!(coin.release_date(), NaiveDate::from_ymd_opt(2025, 6, 1));
    }

    #[test]
    fn page_without_title_is_not_a_coin() {
        assert!(scrape_coin("<html><h1>Catalogo</h1></html>", "u").is_none());
        assert!(!is_product_page(&Html::parse_document("<h1>Catalogo</h1>")));
    }

    #[test]
    fn empty_title_is_still_a_coin() {
        let html = r#"<h1 class="page-title"><span class="base"></span></h1>
            <div class="product-info-main"><table class="data">
              <tr><th>Contingente</th><td>900</td></tr>
            </table></div>"#;
        assert!(is_product_page(&Html::parse_document(html)));
        let coin = scrape_coin(html, "https://www.shop.ipzs.it/it/x.html").unwrap();
        assert_eq!(coin.name, "");
        assert_eq!(coin.mintage(), Some(900));
    }

    #[test]
    fn collects_category_links() {
        let html = r#"
            <ol class="products">
              <li><a class="product-item-link" href="https://www.shop.ipzs.it/it/a.html">A</a></li>
              <li><a class="product-item-link" href="">empty</a></li>
              <li><a class="product-item-link">none</a></li>
              <li><a href="https://www.shop.ipzs.it/it/other.html">other</a></li>
            </ol>"#;
        assert_eq!(product_links(html), vec!["https://www.shop.ipzs.it/it/a.html"]);
    }

    #[test]
    fn mintage_parsing() {
        assert_eq!(parse_mintage("1.500"), Some(1500));
        assert_eq!(parse_mintage("n. 3 000 pezzi"), Some(3000));
        assert_eq!(parse_mintage("max 250 / 2025"), Some(250));
        assert_eq!(parse_mintage("N/A"), None);
        assert_eq!(parse_mintage(""), None);
    }

    #[test]
    fn date_formats() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 7);
        assert_eq!(parse_date("07/03/2025"), d);
        assert_eq!(parse_date(" 2025-03-07 "), d);
        assert_eq!(parse_date("7 Mar 2025"), d);
        assert_eq!(parse_date("07 March 2025"), d);
        assert_eq!(parse_date("N/A"), None);
        assert_eq!(parse_date("7 marzo 2025"), None);
    }
}
