use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Keys holding per-variant listings that can run to hundreds of entries.
const BULKY_KEYS: &[&str] = &["formats", "requested_formats"];

/// Metadata yt-dlp reports for one entry, as written to its `.info.json` sidecar.
///
/// Kept as an open map: every extractor reports a different field set, and
/// callers get whatever the platform exposed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InfoJson(Map<String, Value>);

impl InfoJson {
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None
        }
    }

    pub async fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read(path).await?;
        let value: Value = serde_json::from_slice(&raw).map_err(|source| Error::InfoJsonInvalid {
            path: path.to_path_buf(),
            source
        })?;
        Self::from_value(value).ok_or_else(|| Error::InfoJsonNotObject(path.to_path_buf()))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn id(&self) -> Option<&str> {
        self.get_str("id")
    }

    pub fn title(&self) -> Option<&str> {
        self.get_str("title")
    }

    pub fn ext(&self) -> Option<&str> {
        self.get_str("ext")
    }

    pub fn extractor(&self) -> Option<&str> {
        self.get_str("extractor_key").or_else(|| self.get_str("extractor"))
    }

    pub fn duration(&self) -> Option<f64> {
        self.0.get("duration").and_then(Value::as_f64)
    }

    /// The sidecar yt-dlp writes for a playlist itself, next to its entries'.
    pub fn is_playlist(&self) -> bool {
        self.get_str("_type") == Some("playlist")
    }

    /// Drops the format listings, leaving the descriptive fields.
    pub fn strip_bulky(&mut self) {
        for key in BULKY_KEYS {
            self.0.remove(*key);
        }
    }
}
