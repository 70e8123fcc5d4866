use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use tower::Service;
use tracing::info;

use crate::browser::BrowserHandle;
use crate::config::WatcherConfig;
use crate::error::WatcherError;
use crate::scrape::scrape_all;
use crate::sources::{default_sources, RawProduct, SourceConfig};

/// Request for one on-demand scrape cycle (no notification, no loop).
#[derive(Debug, Clone)]
pub struct CycleRequest {
    pub headless: bool,
    pub timeout: Duration,
    pub sources: Vec<SourceConfig>,
}

impl CycleRequest {
    pub fn new() -> Self {
        Self {
            headless: true,
            timeout: Duration::from_secs(60),
            sources: default_sources(),
        }
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_sources(mut self, sources: Vec<SourceConfig>) -> Self {
        self.sources = sources;
        self
    }
}

impl Default for CycleRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl From<CycleRequest> for WatcherConfig {
    fn from(req: CycleRequest) -> Self {
        WatcherConfig::default()
            .with_headless(req.headless)
            .with_timeout(req.timeout)
            .with_sources(req.sources)
    }
}

/// Result of one cycle.
#[derive(Debug)]
pub struct CycleReport {
    pub products: Vec<RawProduct>,
    pub elapsed: Duration,
}

/// tower::Service running one launch-scrape-close cycle per request.
#[derive(Debug, Clone, Default)]
pub struct WatchService {
    // Room for middleware state (rate limiting, caching) later.
}

impl WatchService {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Service<CycleRequest> for WatchService {
    type Response = CycleReport;
    type Error = WatcherError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: CycleRequest) -> Self::Future {
        info!("cycle requested: {} sources", req.sources.len());

        Box::pin(async move {
            let config: WatcherConfig = req.into();
            let started = Instant::now();

            let browser = BrowserHandle::launch(&config).await?;
            let products = scrape_all(&browser, &config.sources).await;
            browser.close().await;

            let elapsed = started.elapsed();
            info!("cycle done: {} products in {:?}", products.len(), elapsed);

            Ok(CycleReport { products, elapsed })
        })
    }
}
