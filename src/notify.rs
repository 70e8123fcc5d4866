//! Mailjet delivery of the aggregated product list.
//!
//! The gateway owns formatting and transport; the pipeline only hands it the
//! flattened products, at most once per cycle and only when non-empty.

use async_trait::async_trait;
use tracing::info;

use crate::config::WatcherConfig;
use crate::error::WatcherError;
use crate::sources::RawProduct;
use crate::traits::Notifier;

const MAILJET_SEND_URL: &str = "https://api.mailjet.com/v3.1/send";
const SUBJECT: &str = "Graphic card available !";

pub struct MailjetNotifier {
    api_key: Option<String>,
    api_secret: Option<String>,
    to_email: Option<String>,
    to_name: String,
    client: reqwest::Client,
}

impl MailjetNotifier {
    pub fn new(config: &WatcherConfig) -> Self {
        Self {
            api_key: config.mailjet_api_key.clone(),
            api_secret: config.mailjet_api_secret.clone(),
            to_email: config.mail_to_email.clone(),
            to_name: config.mail_to_name.clone(),
            client: reqwest::Client::new(),
        }
    }

    /// Credentials and recipient are only required once there is something
    /// to send. Absence is a configuration error, fatal to the process.
    fn delivery_settings(&self) -> Result<(&str, &str, &str), WatcherError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| WatcherError::Config("MAILJET_API_KEY is not set".to_string()))?;
        let secret = self
            .api_secret
            .as_deref()
            .ok_or_else(|| WatcherError::Config("MAILJET_API_SECRET is not set".to_string()))?;
        let to = self
            .to_email
            .as_deref()
            .ok_or_else(|| WatcherError::Config("MAILJET_TO_EMAIL is not set".to_string()))?;
        Ok((key, secret, to))
    }

    fn build_html(products: &[RawProduct]) -> String {
        let items: String = products
            .iter()
            .map(|p| {
                format!(
                    r#"<li><a href="{}">{} (<strong>{}</strong>)</a></li>"#,
                    p.link, p.name, p.price
                )
            })
            .collect();

        format!(
            "<h3>Cartes graphiques en stock</h3><ul>{}</ul><p>Checked at {}</p>",
            items,
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        )
    }
}

#[async_trait]
impl Notifier for MailjetNotifier {
    async fn send(&self, products: &[RawProduct]) -> Result<(), WatcherError> {
        let (key, secret, to) = self.delivery_settings()?;

        let address = serde_json::json!({ "Email": to, "Name": self.to_name });
        let body = serde_json::json!({
            "Messages": [{
                "From": address.clone(),
                "To": [address],
                "Subject": SUBJECT,
                "TextPart": "",
                "HTMLPart": Self::build_html(products),
            }]
        });

        let response = self
            .client
            .post(MAILJET_SEND_URL)
            .basic_auth(key, Some(secret))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(WatcherError::Notify(format!(
                "mailjet returned {}: {}",
                status, text
            )));
        }

        info!("notification sent: {} products to {}", products.len(), to);
        Ok(())
    }
}
