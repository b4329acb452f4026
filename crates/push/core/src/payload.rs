//! Notification payload.

/// Notification content and data fields delivered to recipients.
///
/// Kept as raw JSON; the core passes it through untouched and only drivers
/// look inside when building their provider message.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Payload(serde_json::Value);

impl Payload {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }

    /// Check the payload carries something to deliver.
    pub fn validate(&self) -> color_eyre::eyre::Result<()> {
        match &self.0 {
            serde_json::Value::Null => color_eyre::eyre::bail!("payload is null"),
            serde_json::Value::Object(map) if map.is_empty() => {
                color_eyre::eyre::bail!("payload is an empty object")
            }
            serde_json::Value::String(s) if s.is_empty() => {
                color_eyre::eyre::bail!("payload is an empty string")
            }
            serde_json::Value::Array(items) if items.is_empty() => {
                color_eyre::eyre::bail!("payload is an empty array")
            }
            _ => Ok(()),
        }
    }

    /// Look up a string field of the `notification` object.
    pub fn notification_field(&self, field: &str) -> Option<&str> {
        self.0.get("notification")?.get(field)?.as_str()
    }

    /// The `data` object, if present.
    pub fn data(&self) -> Option<&serde_json::Value> {
        self.0.get("data")
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}
