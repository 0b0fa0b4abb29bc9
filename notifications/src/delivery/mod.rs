pub mod expo;

use async_trait::async_trait;
use entities::notifications::{PushMessage, PushReceipt};
#[cfg(test)]
use mockall::automock;

/// The outbound push provider. One call delivers one batch of at most
/// [`crate::config::MAX_MESSAGES_PER_REQUEST`] messages and yields one
/// receipt per message.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn send_batch(&self, messages: Vec<PushMessage>) -> anyhow::Result<Vec<PushReceipt>>;
}
