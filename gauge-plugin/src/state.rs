//! Entity state boundary
//!
//! The host owns the entity registry. Filters only see it through
//! [`StateProvider`], a synchronous lookup from entity id to the current
//! state and its attributes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Attribute carrying the unit a sensor reports in
pub const UNIT_OF_MEASUREMENT: &str = "unit_of_measurement";

/// One entity as the host reports it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    pub entity_id: String,
    /// Current state: usually text such as "21.5" or "unavailable", sometimes a number
    #[serde(default)]
    pub state: JsonValue,
    #[serde(default)]
    pub attributes: Map<String, JsonValue>,
}

impl EntityState {
    pub fn new(entity_id: impl Into<String>, state: impl Into<JsonValue>) -> Self {
        Self {
            entity_id: entity_id.into(),
            state: state.into(),
            attributes: Map::new(),
        }
    }

    /// Builder: set the `unit_of_measurement` attribute
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.attributes.insert(UNIT_OF_MEASUREMENT.to_string(), JsonValue::String(unit.into()));
        self
    }

    pub fn unit_of_measurement(&self) -> Option<&str> {
        self.attributes.get(UNIT_OF_MEASUREMENT).and_then(JsonValue::as_str)
    }

    /// The state as a finite number, if it is one
    pub fn numeric_state(&self) -> Option<f64> {
        let n = match &self.state {
            JsonValue::Number(n) => n.as_f64()?,
            JsonValue::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        n.is_finite().then_some(n)
    }
}

/// Synchronous entity lookup supplied by the host
pub trait StateProvider: Send + Sync {
    fn state(&self, entity_id: &str) -> Option<EntityState>;
}

/// Errors loading a state snapshot
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to read state snapshot '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid state snapshot: {0}")]
    Json(#[from] serde_json::Error),
}

/// In-memory set of entity states
#[derive(Debug, Clone, Default)]
pub struct StateSnapshot {
    states: HashMap<String, EntityState>,
}

impl StateSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(mut self, state: EntityState) -> Self {
        self.states.insert(state.entity_id.clone(), state);
        self
    }

    /// Parse a JSON array of states, the shape of the host's `/api/states`.
    pub fn from_json(json: &str) -> Result<Self, StateError> {
        let states: Vec<EntityState> = serde_json::from_str(json)?;
        Ok(states.into_iter().fold(Self::new(), Self::with_state))
    }

    pub fn from_path(path: &Path) -> Result<Self, StateError> {
        let json = std::fs::read_to_string(path).map_err(|source| StateError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl StateProvider for StateSnapshot {
    fn state(&self, entity_id: &str) -> Option<EntityState> {
        self.states.get(entity_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_state() {
        assert_eq!(EntityState::new("sensor.p", "2").numeric_state(), Some(2.0));
        assert_eq!(EntityState::new("sensor.p", " 1.25 ").numeric_state(), Some(1.25));
        assert_eq!(EntityState::new("sensor.p", 3.5).numeric_state(), Some(3.5));
        assert_eq!(EntityState::new("sensor.p", "unavailable").numeric_state(), None);
        assert_eq!(EntityState::new("sensor.p", "nan").numeric_state(), None);
        assert_eq!(EntityState::new("sensor.p", JsonValue::Null).numeric_state(), None);
    }

    #[test]
    fn test_unit_attribute() {
        let s = EntityState::new("sensor.p", "2").with_unit("kW");
        assert_eq!(s.unit_of_measurement(), Some("kW"));
        assert_eq!(EntityState::new("sensor.p", "2").unit_of_measurement(), None);
    }

    #[test]
    fn test_snapshot_from_host_json() {
        let json = r#"[
            {"entity_id": "sensor.grid_power", "state": "2", "attributes": {"unit_of_measurement": "kW"}},
            {"entity_id": "sensor.outdoor", "state": "unknown"}
        ]"#;
        let snapshot = StateSnapshot::from_json(json).unwrap();
        assert_eq!(snapshot.len(), 2);
        let grid = snapshot.state("sensor.grid_power").unwrap();
        assert_eq!(grid.unit_of_measurement(), Some("kW"));
        assert!(snapshot.state("sensor.outdoor").unwrap().numeric_state().is_none());
        assert!(snapshot.state("sensor.missing").is_none());
    }

    #[test]
    fn test_snapshot_rejects_bad_json() {
        assert!(matches!(StateSnapshot::from_json("{not json"), Err(StateError::Json(_))));
    }

    #[test]
    fn test_snapshot_missing_file() {
        let err = StateSnapshot::from_path(Path::new("/nonexistent/states.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/states.json"));
    }
}
