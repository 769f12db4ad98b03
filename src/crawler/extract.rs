// src/crawler/extract.rs
use std::collections::HashMap;

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use crate::crawler::model::FormData;

static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static FORM_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("form").unwrap());
static FIELD_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("input, select, textarea").unwrap());

/// Absolute link targets found in anchor tags, resolved against the page URL.
pub fn extract_links(body: &str, base: &Url) -> Vec<Url> {
    let document = Html::parse_document(body);
    let mut links = Vec::new();

    for element in document.select(&LINK_SELECTOR) {
        let href = match element.value().attr("href") {
            Some(href) if !href.is_empty() => href,
            _ => continue,
        };

        match base.join(href) {
            Ok(mut url) => {
                url.set_fragment(None);
                links.push(url);
            }
            Err(e) => debug!("Invalid link URL {}: {}", href, e),
        }
    }

    links
}

/// Forms with a resolvable action, with field name to input type mappings.
pub fn extract_forms(body: &str, base: &Url) -> Vec<FormData> {
    let document = Html::parse_document(body);
    let mut forms = Vec::new();

    for form in document.select(&FORM_SELECTOR) {
        let action = match form.value().attr("action") {
            Some(action) if !action.is_empty() => action,
            _ => continue,
        };

        let action = match base.join(action) {
            Ok(url) => url,
            Err(e) => {
                debug!("Invalid form action {}: {}", action, e);
                continue;
            }
        };

        let mut fields = HashMap::new();
        for input in form.select(&FIELD_SELECTOR) {
            let name = match input.value().attr("name") {
                Some(name) if !name.is_empty() => name,
                _ => continue,
            };
            let field_type = input.value().attr("type").unwrap_or("");
            fields.insert(name.to_string(), field_type.to_string());
        }

        let method = form.value().attr("method").unwrap_or("");
        forms.push(FormData::new(action, method, fields));
    }

    forms
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
            <a href="/about">About</a>
            <a href="https://example.com/docs#intro">Docs</a>
            <a href="https://other.com/external">External</a>
            <a href="">empty</a>
            <form action="/login" method="post">
                <input type="text" name="username">
                <input type="password" name="password">
                <input type="submit" value="Go">
                <select name="remember"><option>yes</option></select>
            </form>
            <form method="get"><input name="orphan"></form>
        </body></html>
    "#;

    #[test]
    fn resolves_links_against_base() {
        let base = Url::parse("https://example.com/index.html").unwrap();
        let links = extract_links(PAGE, &base);

        assert!(links.contains(&Url::parse("https://example.com/about").unwrap()));
        // fragments are stripped so revisits dedupe
        assert!(links.contains(&Url::parse("https://example.com/docs").unwrap()));
        assert!(links.contains(&Url::parse("https://other.com/external").unwrap()));
        assert_eq!(links.len(), 3);
    }

    #[test]
    fn extracts_forms_with_actions() {
        let base = Url::parse("https://example.com/index.html").unwrap();
        let forms = extract_forms(PAGE, &base);

        // the action-less form is skipped
        assert_eq!(forms.len(), 1);

        let form = &forms[0];
        assert_eq!(form.action().as_str(), "https://example.com/login");
        assert_eq!(form.method(), "POST");
        assert_eq!(form.fields().get("username"), Some(&"text".to_string()));
        assert_eq!(form.fields().get("password"), Some(&"password".to_string()));
        assert_eq!(form.fields().get("remember"), Some(&"".to_string()));
        assert!(!form.fields().contains_key(""));
    }
}
