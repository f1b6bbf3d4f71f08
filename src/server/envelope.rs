use crate::errors::EngineError;
use serde::Deserialize;
use serde::Serialize;

/// The wire envelope every message travels in: a type tag, optional
/// correlation id and timestamp, and a free-form data object the
/// handler for that type interprets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "messageId", default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Envelope {
    pub fn new(kind: &str, data: serde_json::Value) -> Self {
        Self {
            kind: kind.to_string(),
            message_id: None,
            timestamp: Some(now()),
            data,
        }
    }

    pub fn parse(text: &str) -> Result<Self, EngineError> {
        let envelope: Self = serde_json::from_str(text)
            .map_err(|e| EngineError::invalid("message", e.to_string()))?;
        if envelope.kind.is_empty() {
            return Err(EngineError::invalid("type", "must be non-empty"));
        }
        Ok(envelope)
    }

    /// reply envelope correlated to this message
    pub fn reply(&self, kind: &str, data: serde_json::Value) -> Envelope {
        Envelope {
            kind: kind.to_string(),
            message_id: self.message_id.clone(),
            timestamp: Some(now()),
            data,
        }
    }

    pub fn error(&self, error: &EngineError) -> Envelope {
        self.reply(
            "error",
            serde_json::json!({
                "error": error.to_string(),
                "errorCode": error.code(),
                "status": "error",
                "retryable": error.retryable(),
            }),
        )
    }
}

pub fn now() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
