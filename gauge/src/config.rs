//! Host configuration
//!
//! The integration is switched on by the presence of one key in the host's
//! configuration. The key's value carries no options.

use gauge_core::GaugeError;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use std::path::Path;
use tracing::info;

/// Key that enables the integration
pub const CONFIG_KEY: &str = "unit_conversions";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IntegrationConfig;

impl IntegrationConfig {
    /// `Some` when the host configuration carries `unit_conversions`
    pub fn from_host(host: &JsonValue) -> Option<Self> {
        host.get(CONFIG_KEY).map(|_| IntegrationConfig)
    }
}

/// Host configuration that enables the integration and nothing else
pub fn default_host_config() -> JsonValue {
    let mut host = serde_json::Map::new();
    host.insert(CONFIG_KEY.to_string(), json!({}));
    JsonValue::Object(host)
}

/// Read a JSON host configuration file.
///
/// A missing file yields [`default_host_config`].
pub fn load_host_config(path: &Path) -> Result<JsonValue, GaugeError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "no host configuration file, using defaults");
            return Ok(default_host_config());
        }
        Err(e) => {
            return Err(GaugeError::config_error(format!("cannot read '{}': {}", path.display(), e)));
        }
    };
    let host: JsonValue = serde_json::from_str(&text)
        .map_err(|e| GaugeError::config_error(format!("invalid JSON in '{}': {}", path.display(), e)))?;
    if !host.is_object() {
        return Err(GaugeError::config_error(format!("'{}' must contain a JSON object", path.display())));
    }
    Ok(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presence_flag() {
        assert_eq!(IntegrationConfig::from_host(&json!({"unit_conversions": {}})), Some(IntegrationConfig));
        assert_eq!(IntegrationConfig::from_host(&json!({"unit_conversions": null})), Some(IntegrationConfig));
        assert_eq!(IntegrationConfig::from_host(&json!({"unit_conversions": {"ignored": 1}})), Some(IntegrationConfig));
        assert_eq!(IntegrationConfig::from_host(&json!({"sensor": []})), None);
        assert_eq!(IntegrationConfig::from_host(&json!([])), None);
    }

    #[test]
    fn test_missing_file_enables_defaults() {
        let host = load_host_config(Path::new("/nonexistent/gauge.json")).unwrap();
        assert!(IntegrationConfig::from_host(&host).is_some());
    }

    #[test]
    fn test_bad_file_is_config_error() {
        let path = std::env::temp_dir().join(format!("gauge-config-test-{}.json", std::process::id()));
        std::fs::write(&path, "{ nope").unwrap();
        let err = load_host_config(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert_eq!(err.code, gauge_core::codes::CONFIG_ERROR);
    }
}
