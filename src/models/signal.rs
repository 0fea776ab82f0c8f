use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Payload key holding the signal id.
pub const SIGNAL_ID_KEY: &str = "id";
pub const SIGNAL_TYPE_NONE: i64 = 0;
pub const SIGNAL_TYPE_DOWNLOAD: i64 = 1;

/// A small command queued for one host.
///
/// The payload is an opaque JSON object; the assigned id lives under `"id"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signal(Map<String, Value>);

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    /// "Download `path` from `bucket` at `endpoint`".
    pub fn download(path: &str, endpoint: &str, bucket: &str) -> Self {
        Self::new()
            .with("type", SIGNAL_TYPE_DOWNLOAD)
            .with("path", path)
            .with("endpoint", endpoint)
            .with("bucket", bucket)
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.0.get(SIGNAL_ID_KEY).and_then(Value::as_str)
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.0
            .insert(SIGNAL_ID_KEY.to_string(), Value::String(id.into()));
    }

    pub fn signal_type(&self) -> i64 {
        self.0
            .get("type")
            .and_then(Value::as_i64)
            .unwrap_or(SIGNAL_TYPE_NONE)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

impl From<Map<String, Value>> for Signal {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
