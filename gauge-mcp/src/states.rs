//! Entity states read from a JSON file on every lookup

use gauge_plugin::{EntityState, StateProvider, StateSnapshot};
use std::path::PathBuf;
use tracing::warn;

/// States backed by a file the host keeps current
#[derive(Debug, Clone)]
pub struct FileStates {
    path: PathBuf,
}

impl FileStates {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StateProvider for FileStates {
    fn state(&self, entity_id: &str) -> Option<EntityState> {
        match StateSnapshot::from_path(&self.path) {
            Ok(snapshot) => snapshot.state(entity_id),
            Err(e) => {
                warn!(entity_id, error = %e, "state snapshot unavailable");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_current_file() {
        let path = std::env::temp_dir().join(format!("gauge-states-{}.json", std::process::id()));
        std::fs::write(&path, r#"[{"entity_id": "sensor.grid_power", "state": "2",
            "attributes": {"unit_of_measurement": "kW"}}]"#).unwrap();
        let states = FileStates::new(&path);
        let grid = states.state("sensor.grid_power").unwrap();
        assert_eq!(grid.unit_of_measurement(), Some("kW"));

        std::fs::write(&path, r#"[{"entity_id": "sensor.grid_power", "state": "3"}]"#).unwrap();
        assert_eq!(states.state("sensor.grid_power").and_then(|s| s.numeric_state()), Some(3.0));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_file_is_unresolved() {
        let states = FileStates::new("/nonexistent/states.json");
        assert!(states.state("sensor.grid_power").is_none());
    }
}
