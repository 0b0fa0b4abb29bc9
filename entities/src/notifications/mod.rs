use serde::{Deserialize, Serialize};

/// Opaque provider token for one device. A device registered without push
/// permission carries an empty token and is skipped at delivery time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PushToken(String);

impl PushToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for PushToken {
    fn from(value: String) -> Self {
        PushToken(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PushPriority {
    Default,
    Normal,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PushSound {
    Default,
}

/// One outbound push, fanned out to every recipient token. Built per
/// appointment, batched, sent and discarded; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushMessage {
    pub to: Vec<PushToken>,
    pub title: String,
    pub body: String,
    pub sound: PushSound,
    pub priority: PushPriority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PushReceiptStatus {
    Ok,
    Error,
}

/// Per-message delivery acknowledgement from the gateway.
#[derive(Debug, Clone)]
pub struct PushReceipt {
    pub status: PushReceiptStatus,
    pub details: Option<String>,
}
