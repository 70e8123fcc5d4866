//! chromiumoxide-backed browser lifecycle and per-source page sessions.
//!
//! One [`BrowserHandle`] lives for exactly one polling cycle. Every source
//! opens its own isolated [`PageSession`] on it; sessions share nothing but
//! the underlying browser process.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::WatcherConfig;
use crate::error::WatcherError;
use crate::sources::{ExtractionRule, RawProduct};
use crate::traits::{BrowserProvider, ProductPage, SessionFactory};

/// A launched browser instance plus its CDP event pump.
pub struct BrowserHandle {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

impl BrowserHandle {
    /// Launch a fresh browser for one cycle.
    pub async fn launch(config: &WatcherConfig) -> Result<Self, WatcherError> {
        info!("launching browser (headless: {})", config.headless);

        let mut builder = BrowserConfig::builder()
            .request_timeout(config.timeout)
            .no_sandbox()
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu");

        if let Some(path) = &config.chrome_path {
            builder = builder.chrome_executable(path);
        }

        if !config.headless {
            builder = builder.with_head();
        }

        let browser_config = builder
            .build()
            .map_err(|e| WatcherError::BrowserInit(format!("browser config error: {}", e)))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| WatcherError::BrowserInit(e.to_string()))?;

        // Drain CDP events until the browser goes away.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    debug!("browser event stream closed: {:?}", event);
                    break;
                }
            }
        });

        debug!("browser launched");
        Ok(Self {
            browser,
            handler_task,
        })
    }

    /// Tear the browser down. Runs on every cycle exit path so a failed
    /// scrape never leaks a browser process.
    pub async fn close(mut self) {
        let _ = self.browser.close().await;
        let _ = self.browser.wait().await;
        self.handler_task.abort();
        debug!("browser closed");
    }
}

/// Production provider: one fresh chromiumoxide browser per cycle, never
/// reused across cycles.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeLauncher;

#[async_trait]
impl BrowserProvider for ChromeLauncher {
    type Browser = BrowserHandle;

    async fn launch(&self, config: &WatcherConfig) -> Result<BrowserHandle, WatcherError> {
        BrowserHandle::launch(config).await
    }

    async fn shutdown(&self, browser: BrowserHandle) {
        browser.close().await;
    }
}

#[async_trait]
impl SessionFactory for BrowserHandle {
    type Session = PageSession;

    async fn open(&self, source_name: &str) -> Result<PageSession, WatcherError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| WatcherError::BrowserInit(e.to_string()))?;

        debug!("[{}] page session opened", source_name);
        Ok(PageSession {
            name: source_name.to_string(),
            page,
        })
    }
}

/// One isolated page, tagged with its source name for log context.
pub struct PageSession {
    name: String,
    page: Page,
}

impl PageSession {
    /// JS evaluated in-page: maps every container element to plain
    /// `{name, link, price}` data. Missing sub-elements degrade the single
    /// field, never the whole item.
    fn extraction_expression(rule: &ExtractionRule) -> Result<String, WatcherError> {
        let quote = |s: &str| {
            serde_json::to_string(s).map_err(|e| WatcherError::Extraction(e.to_string()))
        };

        let container = quote(rule.container_selector)?;
        let link = quote(rule.link_selector)?;
        let name = match rule.name_selector {
            Some(selector) => quote(selector)?,
            None => "null".to_string(),
        };
        let price = quote(rule.price_selector)?;
        let prefix = quote(rule.link_prefix)?;

        Ok(format!(
            r#"
            (function(containerSel, linkSel, nameSel, priceSel, linkPrefix) {{
                var containers = document.querySelectorAll(containerSel);
                var out = [];
                for (var i = 0; i < containers.length; i++) {{
                    var el = containers[i];
                    var nameEl = el.querySelector(nameSel || linkSel);
                    var linkEl = el.querySelector(linkSel);
                    var priceEl = el.querySelector(priceSel);
                    var href = linkEl ? linkEl.getAttribute('href') : null;
                    out.push({{
                        name: nameEl && nameEl.textContent ? nameEl.textContent.trim() : '',
                        link: linkPrefix + (href || ''),
                        price: priceEl && priceEl.textContent ? priceEl.textContent.trim() : ''
                    }});
                }}
                return JSON.stringify(out);
            }})({container}, {link}, {name}, {price}, {prefix})
            "#
        ))
    }
}

#[async_trait]
impl ProductPage for PageSession {
    async fn navigate(&self, url: &str) -> Result<(), WatcherError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| WatcherError::Navigation(e.to_string()))?;

        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| WatcherError::Navigation(e.to_string()))?;

        debug!("[{}] navigated to {}", self.name, url);
        Ok(())
    }

    async fn content(&self) -> Result<String, WatcherError> {
        self.page
            .content()
            .await
            .map_err(|e| WatcherError::Extraction(e.to_string()))
    }

    async fn extract(&self, rule: &ExtractionRule) -> Result<Vec<RawProduct>, WatcherError> {
        let expression = Self::extraction_expression(rule)?;

        // The page serializes the product list itself so only plain JSON
        // crosses the CDP boundary, never element handles.
        let json: String = self
            .page
            .evaluate(expression)
            .await
            .map_err(|e| WatcherError::Extraction(e.to_string()))?
            .into_value()
            .map_err(|e| WatcherError::Extraction(e.to_string()))?;

        serde_json::from_str(&json)
            .map_err(|e| WatcherError::Extraction(format!("product decode error: {}", e)))
    }

    async fn close(self) {
        if let Err(e) = self.page.close().await {
            debug!("[{}] failed to close page: {}", self.name, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::top_achat;

    #[test]
    fn test_extraction_expression_quotes_selectors() {
        let rule = top_achat().rule;
        let expression = PageSession::extraction_expression(&rule).unwrap();

        // Selectors land as JS string literals, the optional name selector
        // as a real value (fallback only happens when it is null).
        assert!(expression.contains(r#"".produits.list .grille-produit""#));
        assert!(expression.contains(r#"".libelle a:not(.avis) h3""#));
        assert!(expression.contains(r#""https://www.topachat.com""#));
        assert!(expression.contains("nameSel || linkSel"));
    }

    #[test]
    fn test_extraction_expression_null_name_selector() {
        let rule = ExtractionRule {
            container_selector: ".item",
            link_selector: "a",
            name_selector: None,
            price_selector: ".price",
            out_of_stock_marker: "no stock",
            link_prefix: "https://example.com",
        };

        let expression = PageSession::extraction_expression(&rule).unwrap();
        assert!(expression.contains(r#"(".item", "a", null, ".price", "https://example.com")"#));
    }
}
