// src/crawler/model.rs
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use url::Url;

use crate::http::HttpResponseData;

/// Candidate URL waiting in the crawl queue.
#[derive(Debug, Clone)]
pub(crate) struct CrawlTask {
    pub url: Url,
    pub depth: usize,
}

pub(crate) type CrawlQueue = Arc<Mutex<VecDeque<CrawlTask>>>;
pub(crate) type VisitedSet = Arc<Mutex<HashSet<Url>>>;

/// Form discovered on a crawled page.
#[derive(Debug, Clone)]
pub struct FormData {
    action: Url,
    method: String,
    fields: HashMap<String, String>,
}

impl FormData {
    pub fn new(action: Url, method: &str, fields: HashMap<String, String>) -> Self {
        let method = if method.is_empty() {
            "GET".to_string()
        } else {
            method.to_uppercase()
        };
        Self {
            action,
            method,
            fields,
        }
    }

    pub fn action(&self) -> &Url {
        &self.action
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Field name to input type.
    pub fn fields(&self) -> &HashMap<String, String> {
        &self.fields
    }
}

/// One successfully fetched, in-scope page.
#[derive(Debug)]
pub struct CrawledPage {
    url: Url,
    response: HttpResponseData,
    depth: usize,
    forms: Vec<FormData>,
}

impl CrawledPage {
    pub fn new(url: Url, response: HttpResponseData, depth: usize, forms: Vec<FormData>) -> Self {
        Self {
            url,
            response,
            depth,
            forms,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn response(&self) -> &HttpResponseData {
        &self.response
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn forms(&self) -> &[FormData] {
        &self.forms
    }
}

/// Accumulated crawl output.
///
/// Mutated concurrently by crawler workers while the crawl runs; read-only
/// once the crawl phase ends. Pages are keyed by URL, last write wins.
#[derive(Debug)]
pub struct CrawlResult {
    seed: Url,
    pages: Mutex<HashMap<Url, Arc<CrawledPage>>>,
    errors: Mutex<HashMap<Url, String>>,
    started: Instant,
}

impl CrawlResult {
    pub fn new(seed: Url) -> Self {
        Self {
            seed,
            pages: Mutex::new(HashMap::new()),
            errors: Mutex::new(HashMap::new()),
            started: Instant::now(),
        }
    }

    pub fn seed(&self) -> &Url {
        &self.seed
    }

    pub fn add_page(&self, page: CrawledPage) {
        self.pages
            .lock()
            .insert(page.url().clone(), Arc::new(page));
    }

    pub fn add_error(&self, url: Url, error: String) {
        self.errors.lock().insert(url, error);
    }

    pub fn pages(&self) -> Vec<Arc<CrawledPage>> {
        self.pages.lock().values().cloned().collect()
    }

    pub fn page(&self, url: &Url) -> Option<Arc<CrawledPage>> {
        self.pages.lock().get(url).cloned()
    }

    pub fn errors(&self) -> HashMap<Url, String> {
        self.errors.lock().clone()
    }

    pub fn page_count(&self) -> usize {
        self.pages.lock().len()
    }

    pub fn error_count(&self) -> usize {
        self.errors.lock().len()
    }

    pub fn duration(&self) -> Duration {
        self.started.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn form_method_defaults_to_get() {
        let action = Url::parse("https://example.com/submit").unwrap();
        let form = FormData::new(action.clone(), "", HashMap::new());
        assert_eq!(form.method(), "GET");

        let form = FormData::new(action, "post", HashMap::new());
        assert_eq!(form.method(), "POST");
    }

    #[test]
    fn pages_are_keyed_by_url() {
        let seed = Url::parse("https://example.com/").unwrap();
        let result = CrawlResult::new(seed.clone());

        let response = HttpResponseData::new(
            200,
            "OK",
            HashMap::new(),
            "first",
            Duration::from_millis(1),
        );
        result.add_page(CrawledPage::new(seed.clone(), response, 0, Vec::new()));

        let response = HttpResponseData::new(
            200,
            "OK",
            HashMap::new(),
            "second",
            Duration::from_millis(1),
        );
        result.add_page(CrawledPage::new(seed.clone(), response, 0, Vec::new()));

        assert_eq!(result.page_count(), 1);
        assert_eq!(result.page(&seed).unwrap().response().body(), "second");
    }
}
