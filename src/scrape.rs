//! The scrape-extract-aggregate core: one rule applied to one loaded page,
//! one source scraped end to end with guaranteed session release, and the
//! concurrent fan-out across all configured sources.

use std::time::Instant;

use futures::future::join_all;
use tracing::{error, info, warn};

use crate::error::WatcherError;
use crate::sources::{ExtractionRule, RawProduct, SourceConfig};
use crate::traits::{ProductPage, SessionFactory};

/// Apply one extraction rule to a loaded page.
///
/// The out-of-stock sentinel is checked against the full rendered markup
/// before and independently of the container query: retailer "no results"
/// pages can still carry residual product containers (recommendations) that
/// would otherwise read as available stock.
pub async fn apply_rule<P: ProductPage>(
    page: &P,
    source_name: &str,
    rule: &ExtractionRule,
) -> Result<Vec<RawProduct>, WatcherError> {
    let markup = page.content().await?;
    if markup.contains(rule.out_of_stock_marker) {
        info!("[{}] out-of-stock marker present", source_name);
        return Ok(Vec::new());
    }

    let products = page.extract(rule).await?;
    if products.is_empty() {
        // In stock per the sentinel, yet the container query found nothing.
        // Most likely the site markup changed under the selectors.
        warn!(
            "[{}] no out-of-stock marker but 0 products extracted, selectors may be stale",
            source_name
        );
    } else {
        info!("[{}] found {} products", source_name, products.len());
    }

    Ok(products)
}

/// Scrape one source end to end: open a session, navigate, apply the rule.
///
/// The session is released on every exit path. A source without a configured
/// URL is disabled and contributes an empty result without opening anything.
pub async fn scrape_source<F: SessionFactory>(
    factory: &F,
    source: &SourceConfig,
) -> Result<Vec<RawProduct>, WatcherError> {
    let Some(url) = source.url.as_deref() else {
        info!("[{}] no target URL configured, skipping", source.name);
        return Ok(Vec::new());
    };

    let started = Instant::now();
    let session = factory.open(source.name).await?;

    let result = async {
        session.navigate(url).await?;
        apply_rule(&session, source.name, &source.rule).await
    }
    .await;

    session.close().await;

    if let Ok(products) = &result {
        info!(
            "[{}] scraped {} products in {:?}",
            source.name,
            products.len(),
            started.elapsed()
        );
    }

    result
}

/// Scrape every configured source concurrently on one shared browser and
/// flatten the results in configuration order.
///
/// Waits for all sources (join-all, not fail-fast): one source failing must
/// not cost the others their chance to contribute. A failed source is logged
/// and contributes nothing.
pub async fn scrape_all<F: SessionFactory>(
    factory: &F,
    sources: &[SourceConfig],
) -> Vec<RawProduct> {
    let outcomes = join_all(sources.iter().map(|source| scrape_source(factory, source))).await;
    merge_results(sources, outcomes)
}

/// Flatten per-source outcomes in configuration order, isolating failures.
fn merge_results(
    sources: &[SourceConfig],
    outcomes: Vec<Result<Vec<RawProduct>, WatcherError>>,
) -> Vec<RawProduct> {
    let mut products = Vec::new();
    for (source, outcome) in sources.iter().zip(outcomes) {
        match outcome {
            Ok(found) => products.extend(found),
            Err(e) => error!("[{}] scrape failed: {}", source.name, e),
        }
    }
    products
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;

    fn rule(marker: &'static str) -> ExtractionRule {
        ExtractionRule {
            container_selector: ".item",
            link_selector: "a",
            name_selector: None,
            price_selector: ".price",
            out_of_stock_marker: marker,
            link_prefix: "https://example.com",
        }
    }

    fn source(name: &'static str, marker: &'static str) -> SourceConfig {
        SourceConfig {
            name,
            url: Some(format!("https://example.com/{}", name)),
            rule: rule(marker),
        }
    }

    fn product(name: &str) -> RawProduct {
        RawProduct {
            name: name.to_string(),
            link: format!("https://example.com/p/{}", name),
            price: "€299".to_string(),
        }
    }

    struct StubSession {
        markup: String,
        products: Vec<RawProduct>,
        navigation_delay: Duration,
        fail_navigation: bool,
        extract_calls: Arc<AtomicUsize>,
    }

    impl StubSession {
        fn new(markup: &str, products: Vec<RawProduct>) -> Self {
            Self {
                markup: markup.to_string(),
                products,
                navigation_delay: Duration::ZERO,
                fail_navigation: false,
                extract_calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.navigation_delay = delay;
            self
        }

        fn failing(mut self) -> Self {
            self.fail_navigation = true;
            self
        }
    }

    #[async_trait]
    impl ProductPage for StubSession {
        async fn navigate(&self, url: &str) -> Result<(), WatcherError> {
            tokio::time::sleep(self.navigation_delay).await;
            if self.fail_navigation {
                return Err(WatcherError::Navigation(format!("net::ERR at {}", url)));
            }
            Ok(())
        }

        async fn content(&self) -> Result<String, WatcherError> {
            Ok(self.markup.clone())
        }

        async fn extract(&self, _rule: &ExtractionRule) -> Result<Vec<RawProduct>, WatcherError> {
            self.extract_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.products.clone())
        }

        async fn close(self) {}
    }

    struct StubFactory {
        sessions: Mutex<HashMap<&'static str, StubSession>>,
        opened: Mutex<Vec<String>>,
    }

    impl StubFactory {
        fn new(sessions: Vec<(&'static str, StubSession)>) -> Self {
            Self {
                sessions: Mutex::new(sessions.into_iter().collect()),
                opened: Mutex::new(Vec::new()),
            }
        }

        fn opened(&self) -> Vec<String> {
            self.opened.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SessionFactory for StubFactory {
        type Session = StubSession;

        async fn open(&self, source_name: &str) -> Result<StubSession, WatcherError> {
            self.opened.lock().unwrap().push(source_name.to_string());
            self.sessions
                .lock()
                .unwrap()
                .remove(source_name)
                .ok_or_else(|| WatcherError::BrowserInit(format!("no session: {}", source_name)))
        }
    }

    #[tokio::test]
    async fn test_sentinel_takes_precedence_over_containers() {
        // Residual containers on a "no results" page must not read as stock.
        let session = StubSession::new(
            "<html>no products found</html>",
            vec![product("a"), product("b"), product("c"), product("d"), product("e")],
        );
        let calls = session.extract_calls.clone();

        let products = apply_rule(&session, "TEST", &rule("no products found"))
            .await
            .unwrap();

        assert!(products.is_empty());
        // Short-circuits before the container query runs.
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_zero_products_without_sentinel_is_valid() {
        let session = StubSession::new("<html>plenty of stock markup</html>", Vec::new());

        let products = apply_rule(&session, "TEST", &rule("no products found"))
            .await
            .unwrap();

        assert!(products.is_empty());
    }

    #[derive(Clone, Default)]
    struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

    impl CaptureWriter {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl std::io::Write for CaptureWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CaptureWriter {
        type Writer = CaptureWriter;

        fn make_writer(&'a self) -> CaptureWriter {
            self.clone()
        }
    }

    #[test]
    fn test_zero_products_without_sentinel_warns_about_stale_selectors() {
        let capture = CaptureWriter::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(capture.clone())
            .finish();

        // The stub resolves without timers, so the rule can run to completion
        // under a thread-local subscriber on a plain blocking executor.
        let session = StubSession::new("<html>plenty of stock markup</html>", Vec::new());
        let products = tracing::subscriber::with_default(subscriber, || {
            futures::executor::block_on(apply_rule(&session, "TEST", &rule("no products found")))
        })
        .unwrap();

        assert!(products.is_empty());
        let output = capture.contents();
        assert!(output.contains("WARN"), "missing warning in: {}", output);
        assert!(output.contains("selectors may be stale"));
    }

    #[tokio::test]
    async fn test_extraction_passes_products_through() {
        let expected = vec![product("rtx-3080"), product("rtx-3090")];
        let session = StubSession::new("<html>listing</html>", expected.clone());

        let products = apply_rule(&session, "TEST", &rule("no products found"))
            .await
            .unwrap();

        assert_eq!(products, expected);
    }

    #[tokio::test]
    async fn test_source_without_url_skips_navigation() {
        let factory = StubFactory::new(vec![]);
        let source = source("A", "none").disabled();

        let products = scrape_source(&factory, &source).await.unwrap();

        assert!(products.is_empty());
        assert!(factory.opened().is_empty());
    }

    #[tokio::test]
    async fn test_fanout_isolates_one_failing_source() {
        // A fails after the others would have resolved; B and C still
        // contribute their 2 and 3 items.
        let factory = StubFactory::new(vec![
            (
                "A",
                StubSession::new("<html></html>", vec![product("never")])
                    .with_delay(Duration::from_millis(30))
                    .failing(),
            ),
            (
                "B",
                StubSession::new(
                    "<html></html>",
                    vec![product("b1"), product("b2")],
                )
                .with_delay(Duration::from_millis(20)),
            ),
            (
                "C",
                StubSession::new(
                    "<html></html>",
                    vec![product("c1"), product("c2"), product("c3")],
                ),
            ),
        ]);
        let sources = vec![source("A", "none"), source("B", "none"), source("C", "none")];

        let products = scrape_all(&factory, &sources).await;

        assert_eq!(products.len(), 5);
        assert_eq!(products[0], product("b1"));
        assert_eq!(products[4], product("c3"));
    }

    #[tokio::test]
    async fn test_fanout_flattens_in_configuration_order() {
        // C resolves first, A last; output order still follows the
        // configured source order.
        let factory = StubFactory::new(vec![
            (
                "A",
                StubSession::new("<html></html>", vec![product("a1")])
                    .with_delay(Duration::from_millis(30)),
            ),
            (
                "B",
                StubSession::new("<html></html>", vec![product("b1")])
                    .with_delay(Duration::from_millis(15)),
            ),
            ("C", StubSession::new("<html></html>", vec![product("c1")])),
        ]);
        let sources = vec![source("A", "none"), source("B", "none"), source("C", "none")];

        let products = scrape_all(&factory, &sources).await;

        assert_eq!(
            products,
            vec![product("a1"), product("b1"), product("c1")]
        );
    }

    #[test]
    fn test_merge_results_substitutes_empty_for_failures() {
        let sources = vec![source("A", "none"), source("B", "none")];
        let outcomes = vec![
            Err(WatcherError::Navigation("timeout".to_string())),
            Ok(vec![product("b1")]),
        ];

        let products = merge_results(&sources, outcomes);

        assert_eq!(products, vec![product("b1")]);
    }
}
