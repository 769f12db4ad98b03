// src/crawler/mod.rs
pub mod extract;
pub mod model;
pub mod robots;

pub use model::{CrawlResult, CrawledPage, FormData};
pub use robots::RobotsPolicy;

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::http::{HttpGateway, HttpResponseData};
use model::{CrawlQueue, CrawlTask, VisitedSet};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(60);

/// Crawl parameters derived from the scan configuration.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub seed: Url,
    pub max_depth: usize,
    pub concurrency: usize,
    pub respect_robots_txt: bool,
}

/// Bounded-depth, same-origin breadth crawler.
///
/// A fixed pool of workers drains a shared queue; a worker exits when it
/// observes an empty queue. Every fetch is paced by the gateway's rate
/// limiter.
pub struct WebCrawler {
    gateway: Arc<dyn HttpGateway>,
    config: Arc<CrawlConfig>,
    robots: Arc<RobotsPolicy>,
    workers: tokio::sync::Mutex<JoinSet<()>>,
}

impl WebCrawler {
    pub fn new(gateway: Arc<dyn HttpGateway>, config: CrawlConfig) -> Self {
        let robots = Arc::new(RobotsPolicy::new(gateway.clone()));
        Self {
            gateway,
            config: Arc::new(config),
            robots,
            workers: tokio::sync::Mutex::new(JoinSet::new()),
        }
    }

    /// Crawl from the configured seed until the queue drains.
    pub async fn crawl(&self) -> CrawlResult {
        info!("Starting crawl from: {}", self.config.seed);

        if self.config.respect_robots_txt {
            self.robots.load(&self.config.seed).await;
        }

        let result = Arc::new(CrawlResult::new(self.config.seed.clone()));
        let queue: CrawlQueue = Arc::new(Mutex::new(VecDeque::from([CrawlTask {
            url: self.config.seed.clone(),
            depth: 0,
        }])));
        let visited: VisitedSet = Arc::new(Mutex::new(HashSet::new()));

        {
            let mut workers = self.workers.lock().await;
            for _ in 0..self.config.concurrency.max(1) {
                let worker = CrawlWorker {
                    gateway: self.gateway.clone(),
                    config: self.config.clone(),
                    robots: self.robots.clone(),
                    queue: queue.clone(),
                    visited: visited.clone(),
                    result: result.clone(),
                };
                workers.spawn(worker.run());
            }

            while let Some(joined) = workers.join_next().await {
                if let Err(e) = joined {
                    error!("Crawl worker failed: {}", e);
                }
            }
        }

        info!("Crawl completed. Visited {} URLs", visited.lock().len());
        Arc::try_unwrap(result).expect("crawl workers still hold the result")
    }

    /// Release the worker pool, aborting workers that do not quiesce within
    /// the grace period.
    pub async fn shutdown(&self) {
        let mut workers = self.workers.lock().await;

        let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
            while workers.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            warn!(
                "Crawl workers did not quiesce within {:?}, aborting",
                SHUTDOWN_GRACE
            );
            workers.shutdown().await;
        }
    }
}

#[derive(Clone)]
struct CrawlWorker {
    gateway: Arc<dyn HttpGateway>,
    config: Arc<CrawlConfig>,
    robots: Arc<RobotsPolicy>,
    queue: CrawlQueue,
    visited: VisitedSet,
    result: Arc<CrawlResult>,
}

impl CrawlWorker {
    async fn run(self) {
        loop {
            let task = self.queue.lock().pop_front();
            let task = match task {
                Some(task) => task,
                None => break,
            };

            // check-and-insert is atomic under the lock
            if !self.visited.lock().insert(task.url.clone()) {
                continue;
            }

            if task.depth > self.config.max_depth {
                continue;
            }

            if !self.in_scope(&task.url) {
                debug!("URL out of scope: {}", task.url);
                continue;
            }

            if self.config.respect_robots_txt && !self.robots.is_allowed(&task.url) {
                debug!("URL disallowed by robots.txt: {}", task.url);
                continue;
            }

            match self.gateway.get(&task.url).await {
                Ok(response) => self.record_page(task, response),
                Err(e) => {
                    warn!("Failed to fetch {}: {}", task.url, e);
                    self.result.add_error(task.url, e.to_string());
                }
            }
        }
    }

    fn record_page(&self, task: CrawlTask, response: HttpResponseData) {
        let mut forms = Vec::new();

        if is_html(&response) {
            for link in extract::extract_links(response.body(), &task.url) {
                if self.in_scope(&link) {
                    self.queue.lock().push_back(CrawlTask {
                        url: link,
                        depth: task.depth + 1,
                    });
                }
            }
            forms = extract::extract_forms(response.body(), &task.url);
        }

        self.result
            .add_page(CrawledPage::new(task.url, response, task.depth, forms));
    }

    fn in_scope(&self, url: &Url) -> bool {
        url.host_str().is_some()
            && url.host_str() == self.config.seed.host_str()
            && url.scheme() == self.config.seed.scheme()
    }
}

fn is_html(response: &HttpResponseData) -> bool {
    response
        .content_type()
        .map(|ct| ct.to_lowercase().contains("text/html"))
        .unwrap_or(false)
}
