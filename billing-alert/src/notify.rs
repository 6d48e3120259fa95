use std::time::Duration;

use reqwest::Client;

use crate::config::BillingConfig;
use crate::errors::BillingError;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(5);

/// Whether the aggregate warrants a notification. Strictly greater
/// than: a total equal to the threshold stays quiet.
pub fn should_notify(total: f64, threshold: f64) -> bool {
    total > threshold
}

/// Message posted when the threshold is breached; names the account by
/// alias when one is configured, and formats the total to two decimals
pub fn breach_message(config: &BillingConfig, total: f64) -> String {
    format!(
        "Blended costs for {} have exceeded the threshold of ${} with ${:.2}.",
        config.account_display_name(),
        config.threshold,
        total
    )
}

/// Posts breach notifications to a Slack-compatible webhook
pub struct Notifier {
    client: Client,
    webhook_url: String,
    channel: String,
}

impl Notifier {
    pub fn new(webhook_url: impl Into<String>, channel: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            webhook_url: webhook_url.into(),
            channel: channel.into(),
        }
    }

    /// Issue the single POST carrying `{"text": ..., "channel": ...}`.
    /// A transport error or non-success status is fatal for the
    /// invocation; there is no retry.
    pub async fn send(&self, text: &str) -> Result<(), BillingError> {
        log::debug!("Posting notification to [{}]", self.channel);

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&serde_json::json!({
                "text": text,
                "channel": self.channel,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BillingError::Notification(format!(
                "webhook returned status [{}]",
                response.status()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(alias: Option<&str>) -> BillingConfig {
        BillingConfig {
            bucket: "billing-exports".to_string(),
            payer_account_id: "111111111111".to_string(),
            linked_account_id: "222222222222".to_string(),
            linked_account_alias: alias.map(str::to_string),
            duration_in_days: 1,
            threshold: 10.0,
            slack_webhook_url: "https://hooks.example.com/T000/B000".to_string(),
            channel: "#billing".to_string(),
            debug: false,
        }
    }

    #[test]
    fn test_notification_is_strictly_greater_than() {
        assert!(should_notify(12.50, 10.0));
        assert!(!should_notify(10.0, 10.0));
        assert!(!should_notify(9.99, 10.0));
    }

    #[test]
    fn test_message_uses_raw_id_without_alias() {
        let message = breach_message(&config(None), 12.5);
        assert_eq!(
            message,
            "Blended costs for 222222222222 have exceeded the threshold of $10 with $12.50."
        );
    }

    #[test]
    fn test_message_prefers_alias() {
        let message = breach_message(&config(Some("staging")), 12.5);
        assert!(message.starts_with("Blended costs for staging"));
        assert!(message.contains("12.50"));
    }

    #[tokio::test]
    async fn test_send_posts_text_and_channel() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/webhook"))
            .and(body_json(serde_json::json!({
                "text": "costs are up",
                "channel": "#billing",
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = Notifier::new(format!("{}/webhook", server.uri()), "#billing");
        notifier.send("costs are up").await.unwrap();
    }

    #[tokio::test]
    async fn test_send_surfaces_webhook_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let notifier = Notifier::new(server.uri(), "#billing");
        let result = notifier.send("costs are up").await;
        assert!(matches!(result, Err(BillingError::Notification(_))));
    }
}
