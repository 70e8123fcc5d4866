use async_trait::async_trait;

use crate::config::WatcherConfig;
use crate::error::WatcherError;
use crate::sources::{ExtractionRule, RawProduct};

/// One loaded retailer page. The two primitives the extraction step needs:
/// the full rendered markup (for the out-of-stock sentinel) and the in-page
/// container query returning plain product data.
#[async_trait]
pub trait ProductPage: Send + Sync {
    /// Navigate the page to `url` and wait for the load to settle.
    async fn navigate(&self, url: &str) -> Result<(), WatcherError>;

    /// Full rendered page markup.
    async fn content(&self) -> Result<String, WatcherError>;

    /// Run the container query against the live DOM. No element handles
    /// escape this boundary, only plain `RawProduct` data.
    async fn extract(&self, rule: &ExtractionRule) -> Result<Vec<RawProduct>, WatcherError>;

    /// Release the page. Infallible on purpose: a close failure is only
    /// worth a debug log, never an error to the caller.
    async fn close(self);
}

/// Opens one isolated page session per source on a shared browser instance.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    type Session: ProductPage;

    async fn open(&self, source_name: &str) -> Result<Self::Session, WatcherError>;
}

/// Launches the per-cycle browser and tears it down afterwards. The poll
/// loop only ever sees this seam, so full cycles run deterministically on
/// stub factories in tests.
#[async_trait]
pub trait BrowserProvider: Send + Sync {
    type Browser: SessionFactory + Send;

    async fn launch(&self, config: &WatcherConfig) -> Result<Self::Browser, WatcherError>;

    /// Release the browser. Runs on every cycle exit path.
    async fn shutdown(&self, browser: Self::Browser);
}

/// Outbound delivery of the aggregated product list.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, products: &[RawProduct]) -> Result<(), WatcherError>;
}
