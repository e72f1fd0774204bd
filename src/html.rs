use scraper::{ElementRef, Selector};
use url::Url;

/// Text of the first element matching any of `selectors`, whitespace collapsed.
pub fn text_from_selectors(scope: ElementRef<'_>, selectors: &[&str]) -> String {
    for sel_str in selectors {
        if let Ok(selector) = Selector::parse(sel_str) {
            if let Some(element) = scope.select(&selector).next() {
                let cleaned = element_text(element);
                if !cleaned.is_empty() {
                    return cleaned;
                }
            }
        }
    }
    String::new()
}

pub fn href_from_selectors(scope: ElementRef<'_>, selectors: &[&str]) -> String {
    for sel_str in selectors {
        if let Ok(selector) = Selector::parse(sel_str) {
            if let Some(element) = scope.select(&selector).next() {
                if let Some(href) = element.value().attr("href") {
                    return href.to_string();
                }
            }
        }
    }
    String::new()
}

pub fn element_text(element: ElementRef<'_>) -> String {
    let text: String = element.text().collect::<Vec<_>>().join(" ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Resolves `href` against the page it was found on and drops any fragment.
pub fn resolve_href(base: &Url, href: &str) -> Option<Url> {
    let href = href.split('#').next().unwrap_or_default().trim();
    if href.is_empty() {
        return None;
    }
    let mut url = base.join(href).ok()?;
    url.set_fragment(None);
    match url.scheme() {
        "http" | "https" => Some(url),
        _ => None,
    }
}
