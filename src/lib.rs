//! GPU stock watcher
//!
//! - Polls retailer listing pages (LDLC, TopAchat, Materiel.net) for in-stock
//!   graphics cards through a headless browser
//! - Sends one aggregated Mailjet email per cycle when anything is in stock
//!
//! # Poll loop usage
//!
//! ```rust,ignore
//! use stock_watcher::{Watcher, WatcherConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = WatcherConfig::from_env();
//!     let watcher = Watcher::new(config);
//!
//!     // Runs until terminated; only fatal errors return.
//!     watcher.run().await.unwrap();
//! }
//! ```
//!
//! # One-shot cycle usage
//!
//! ```rust,ignore
//! use stock_watcher::{CycleRequest, WatchService};
//! use tower::Service;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut service = WatchService::new();
//!
//!     let request = CycleRequest::new().with_headless(false);
//!     let report = service.call(request).await.unwrap();
//!     println!("in stock: {:?}", report.products);
//! }
//! ```

pub mod browser;
pub mod config;
pub mod error;
pub mod notify;
pub mod scrape;
pub mod service;
pub mod sources;
pub mod traits;
pub mod watcher;

// Main types re-exported
pub use browser::{BrowserHandle, ChromeLauncher, PageSession};
pub use config::WatcherConfig;
pub use error::WatcherError;
pub use notify::MailjetNotifier;
pub use scrape::{apply_rule, scrape_all, scrape_source};
pub use service::{CycleReport, CycleRequest, WatchService};
pub use sources::{default_sources, ExtractionRule, RawProduct, SourceConfig};
pub use traits::{BrowserProvider, Notifier, ProductPage, SessionFactory};
pub use watcher::Watcher;
