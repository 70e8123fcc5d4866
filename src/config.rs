use std::time::Duration;

use crate::sources::{default_sources, SourceConfig};

/// Watcher-wide configuration. Built-in defaults match the deployed
/// retailer catalog; everything can be overridden through the environment
/// (see [`WatcherConfig::from_env`]) or the builder methods.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Delay between two polling cycles.
    pub poll_interval: Duration,
    /// Run the browser without a visible UI.
    pub headless: bool,
    /// Upper bound for CDP requests (navigation included).
    pub timeout: Duration,
    /// Explicit browser binary; `None` lets chromiumoxide autodetect.
    pub chrome_path: Option<String>,
    /// Monitored retailers, in notification order.
    pub sources: Vec<SourceConfig>,
    /// Mailjet credentials. Checked at send time, not at startup.
    pub mailjet_api_key: Option<String>,
    pub mailjet_api_secret: Option<String>,
    /// Notification recipient. Checked at send time.
    pub mail_to_email: Option<String>,
    pub mail_to_name: String,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            headless: true,
            timeout: Duration::from_secs(60),
            chrome_path: None,
            sources: default_sources(),
            mailjet_api_key: None,
            mailjet_api_secret: None,
            mail_to_email: None,
            mail_to_name: "Stock watcher".to_string(),
        }
    }
}

impl WatcherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read configuration from the environment.
    ///
    /// - `SCRAP_INTERVAL`: poll interval in seconds (zero and unparsable
    ///   values fall back to the 60s default)
    /// - `CHROME_HEADLESS`: anything but `false` keeps headless mode
    /// - `CHROME_PATH` / `CHROMIUM_PATH`: browser binary override
    /// - `<SOURCE>_URL` (e.g. `LDLC_URL`, `TOP_ACHAT_URL`): per-source target
    ///   URL; an empty value disables that source
    /// - `MAILJET_API_KEY` / `MAILJET_API_SECRET`: Mailjet credentials
    /// - `MAILJET_TO_EMAIL` / `MAILJET_TO_NAME`: notification recipient
    pub fn from_env() -> Self {
        let default = Self::default();

        let sources = default
            .sources
            .into_iter()
            .map(|source| match std::env::var(url_env_key(source.name)) {
                Ok(url) if url.is_empty() => source.disabled(),
                Ok(url) => source.with_url(url),
                Err(_) => source,
            })
            .collect();

        Self {
            poll_interval: std::env::var("SCRAP_INTERVAL")
                .ok()
                .and_then(|v| poll_interval_from(&v))
                .unwrap_or(default.poll_interval),
            headless: std::env::var("CHROME_HEADLESS")
                .map(|v| v != "false")
                .unwrap_or(default.headless),
            timeout: default.timeout,
            chrome_path: std::env::var("CHROME_PATH")
                .or_else(|_| std::env::var("CHROMIUM_PATH"))
                .ok(),
            sources,
            mailjet_api_key: std::env::var("MAILJET_API_KEY").ok(),
            mailjet_api_secret: std::env::var("MAILJET_API_SECRET").ok(),
            mail_to_email: std::env::var("MAILJET_TO_EMAIL").ok(),
            mail_to_name: std::env::var("MAILJET_TO_NAME").unwrap_or(default.mail_to_name),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_chrome_path(mut self, path: impl Into<String>) -> Self {
        self.chrome_path = Some(path.into());
        self
    }

    pub fn with_sources(mut self, sources: Vec<SourceConfig>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_mailjet(mut self, key: impl Into<String>, secret: impl Into<String>) -> Self {
        self.mailjet_api_key = Some(key.into());
        self.mailjet_api_secret = Some(secret.into());
        self
    }

    pub fn with_recipient(mut self, email: impl Into<String>, name: impl Into<String>) -> Self {
        self.mail_to_email = Some(email.into());
        self.mail_to_name = name.into();
        self
    }
}

/// Parse a poll interval from its env value. Zero is treated as unset, a
/// zero-second interval would hammer the retailers in a busy loop.
fn poll_interval_from(value: &str) -> Option<Duration> {
    value
        .parse::<u64>()
        .ok()
        .filter(|&secs| secs > 0)
        .map(Duration::from_secs)
}

/// Env var carrying the target URL for a source: name uppercased, with
/// every non-alphanumeric run collapsed to `_`, plus a `_URL` suffix.
/// `MATERIEL.NET` reads `MATERIEL_NET_URL`.
fn url_env_key(source_name: &str) -> String {
    let mut key = String::with_capacity(source_name.len() + 4);
    for c in source_name.chars() {
        if c.is_ascii_alphanumeric() {
            key.push(c.to_ascii_uppercase());
        } else if !key.ends_with('_') {
            key.push('_');
        }
    }
    key.push_str("_URL");
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = WatcherConfig::new()
            .with_poll_interval(Duration::from_secs(120))
            .with_headless(false)
            .with_timeout(Duration::from_secs(30))
            .with_mailjet("key", "secret")
            .with_recipient("alerts@example.com", "Alerts");

        assert_eq!(config.poll_interval, Duration::from_secs(120));
        assert!(!config.headless);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.mailjet_api_key.as_deref(), Some("key"));
        assert_eq!(config.mailjet_api_secret.as_deref(), Some("secret"));
        assert_eq!(config.mail_to_email.as_deref(), Some("alerts@example.com"));
        assert_eq!(config.mail_to_name, "Alerts");
    }

    #[test]
    fn test_defaults() {
        let config = WatcherConfig::default();

        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert!(config.headless);
        assert_eq!(config.sources.len(), 3);
        assert!(config.mailjet_api_key.is_none());
    }

    #[test]
    fn test_poll_interval_rejects_zero_and_garbage() {
        assert_eq!(poll_interval_from("90"), Some(Duration::from_secs(90)));
        assert_eq!(poll_interval_from("0"), None);
        assert_eq!(poll_interval_from("abc"), None);
        assert_eq!(poll_interval_from("-5"), None);
    }

    #[test]
    fn test_url_env_key() {
        assert_eq!(url_env_key("LDLC"), "LDLC_URL");
        assert_eq!(url_env_key("TOP ACHAT"), "TOP_ACHAT_URL");
        assert_eq!(url_env_key("MATERIEL.NET"), "MATERIEL_NET_URL");
    }
}
