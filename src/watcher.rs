//! The polling loop: one fresh browser per cycle, concurrent fan-out,
//! at-most-one notification, unconditional teardown, fixed delay, repeat.

use std::time::Instant;

use tokio::time::sleep;
use tracing::{error, info};

use crate::browser::ChromeLauncher;
use crate::config::WatcherConfig;
use crate::error::WatcherError;
use crate::notify::MailjetNotifier;
use crate::scrape::scrape_all;
use crate::sources::RawProduct;
use crate::traits::{BrowserProvider, Notifier};

pub struct Watcher<N: Notifier, P: BrowserProvider = ChromeLauncher> {
    config: WatcherConfig,
    notifier: N,
    provider: P,
}

impl Watcher<MailjetNotifier> {
    pub fn new(config: WatcherConfig) -> Self {
        let notifier = MailjetNotifier::new(&config);
        Self {
            config,
            notifier,
            provider: ChromeLauncher,
        }
    }
}

impl<N: Notifier> Watcher<N> {
    pub fn with_notifier(config: WatcherConfig, notifier: N) -> Self {
        Self {
            config,
            notifier,
            provider: ChromeLauncher,
        }
    }
}

impl<N: Notifier, P: BrowserProvider> Watcher<N, P> {
    /// Inject the browser provider. Production code sticks with the
    /// [`ChromeLauncher`] default; tests drive full cycles on stubs.
    pub fn with_provider(config: WatcherConfig, notifier: N, provider: P) -> Self {
        Self {
            config,
            notifier,
            provider,
        }
    }

    /// Run cycles until the process is terminated. Only a fatal error
    /// (browser launch failure, notifier misconfiguration) returns; per-source
    /// trouble stays inside the cycle.
    pub async fn run(&self) -> Result<(), WatcherError> {
        info!(
            "scraping every {}s (headless: {})",
            self.config.poll_interval.as_secs(),
            self.config.headless
        );

        loop {
            self.run_cycle().await?;
            sleep(self.config.poll_interval).await;
        }
    }

    /// One full cycle: launch, fan out, notify if anything was found, close.
    /// The browser is torn down on every path before the result is surfaced.
    pub async fn run_cycle(&self) -> Result<Vec<RawProduct>, WatcherError> {
        let started = Instant::now();
        info!("cycle started");

        let browser = self.provider.launch(&self.config).await?;
        let products = scrape_all(&browser, &self.config.sources).await;
        let dispatched = self.dispatch(&products).await;
        self.provider.shutdown(browser).await;

        info!("cycle finished in {:?}", started.elapsed());

        dispatched?;
        Ok(products)
    }

    /// Deliver the combined list, at most once per cycle and only when
    /// non-empty. Missing notifier configuration is fatal; a delivery
    /// failure is logged and the next cycle's results are the retry.
    async fn dispatch(&self, products: &[RawProduct]) -> Result<(), WatcherError> {
        if products.is_empty() {
            return Ok(());
        }

        info!("products found: {:?}", products);

        match self.notifier.send(products).await {
            Ok(()) => Ok(()),
            Err(e @ WatcherError::Config(_)) => Err(e),
            Err(e) => {
                error!("notification failed: {}", e);
                Ok(())
            }
        }
    }
}
