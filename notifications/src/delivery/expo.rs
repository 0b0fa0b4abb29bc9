use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use entities::notifications::{PushMessage, PushReceipt, PushReceiptStatus};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use shared_kernel::http_client::HttpClient;
use url::Url;

use crate::delivery::PushGateway;

#[derive(Debug, Deserialize, Clone)]
pub struct ExpoConfig {
    pub host: String,
    pub access_token: Secret<String>,
}

/// Expo-style push API client: the batch goes out as one JSON array and the
/// response carries one ticket per message.
pub struct ExpoPushGateway {
    config: ExpoConfig,
}

impl ExpoPushGateway {
    pub fn new(config: ExpoConfig) -> Self {
        Self { config }
    }
}

#[derive(Deserialize)]
struct SendResponse {
    data: Vec<Ticket>,
}

#[derive(Deserialize)]
struct Ticket {
    status: String,
    message: Option<String>,
}

impl From<Ticket> for PushReceipt {
    fn from(ticket: Ticket) -> Self {
        let status = if ticket.status == "ok" {
            PushReceiptStatus::Ok
        } else {
            PushReceiptStatus::Error
        };
        PushReceipt {
            status,
            details: ticket.message,
        }
    }
}

#[async_trait]
impl PushGateway for ExpoPushGateway {
    #[tracing::instrument(err, skip(self, messages), fields(batch_size = messages.len()), level = "info")]
    async fn send_batch(&self, messages: Vec<PushMessage>) -> anyhow::Result<Vec<PushReceipt>> {
        let url = Url::parse(&self.config.host)
            .with_context(|| format!("Invalid push gateway url {}", &self.config.host))?;

        let auth_token = self.config.access_token.expose_secret();
        let bearer_token = format!("Bearer {auth_token}");
        let headers = HashMap::from([("Authorization", bearer_token)]);

        let body = serde_json::to_value(&messages).context("Failed to serialize push batch")?;
        let response: SendResponse = HttpClient::post_json(url, headers, body)
            .await
            .context("Failed to deliver push batch")?;

        Ok(response
            .data
            .into_iter()
            .map(PushReceipt::from)
            .collect())
    }
}
