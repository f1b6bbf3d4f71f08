use crate::errors::EngineError;
use crate::grid::Grid;
use crate::observation::Observation;
use crate::observation::SpawnType;
use crate::Chunk;
use serde::Deserialize;

/// Deserialize and sanity-check an observation payload. Schema errors
/// (missing fields, wrong types) and business-rule violations both
/// surface as `InvalidObservation`; entity chunk ids are clamped into
/// the grid rather than rejected, matching how the cost function treats
/// out-of-range ids.
pub fn parse_observation(grid: &Grid, data: &serde_json::Value) -> Result<Observation, EngineError> {
    let mut obs: Observation = serde_json::from_value(data.clone())
        .map_err(|e| EngineError::invalid("observation", e.to_string()))?;
    if !obs.timestamp.is_finite() || obs.timestamp < 0.0 {
        return Err(EngineError::invalid("timestamp", "must be a non-negative number"));
    }
    if obs.territory_id.is_empty() {
        return Err(EngineError::invalid("territoryId", "must be non-empty"));
    }
    if !obs.queen_energy.current.is_finite() || obs.queen_energy.current < 0.0 {
        return Err(EngineError::invalid("queenEnergy.current", "must be non-negative"));
    }
    for (name, window) in [
        ("playerEnergy", obs.player_energy),
        ("playerMinerals", obs.player_minerals),
    ] {
        if !window.start.is_finite() || !window.end.is_finite() {
            return Err(EngineError::invalid(name, "must be finite"));
        }
    }
    let clamp = |chunk: Chunk| chunk.clamp(0, grid.chunks() as Chunk - 1);
    obs.hive_chunk = clamp(obs.hive_chunk);
    for list in [
        &mut obs.mining_workers,
        &mut obs.workers_present,
        &mut obs.protectors,
        &mut obs.parasites_start,
        &mut obs.parasites_end,
    ] {
        for entity in list.iter_mut() {
            entity.chunk_id = clamp(entity.chunk_id);
        }
    }
    Ok(obs)
}

/// Feedback from the client about a spawn the gate approved.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnResult {
    #[serde(default = "default_territory")]
    pub territory_id: String,
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub spawn_chunk: Option<Chunk>,
    #[serde(default)]
    pub spawn_type: Option<SpawnType>,
    #[serde(default)]
    pub reason: String,
}

fn default_territory() -> String {
    "sim-territory".to_string()
}

fn default_success() -> bool {
    true
}

pub fn parse_spawn_result(data: &serde_json::Value) -> Result<SpawnResult, EngineError> {
    serde_json::from_value(data.clone()).map_err(|e| EngineError::invalid("spawn_result", e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> serde_json::Value {
        serde_json::json!({
            "timestamp": 5.0,
            "territoryId": "t-1",
            "miningWorkers": [],
            "workersPresent": [{"id": "w0", "chunkId": 400}],
            "protectors": [{"id": "p0", "chunkId": -3}],
            "queenEnergy": {"current": 50.0},
            "playerEnergy": {"start": 100.0, "end": 90.0},
            "playerMinerals": {"start": 40.0, "end": 45.0},
            "hiveChunk": 136
        })
    }

    #[test]
    fn out_of_range_entities_are_clamped() {
        let grid = Grid::new(16);
        let obs = parse_observation(&grid, &payload()).unwrap();
        assert!(obs.workers_present[0].chunk_id == 255);
        assert!(obs.protectors[0].chunk_id == 0);
    }

    #[test]
    fn negative_timestamp_is_rejected() {
        let grid = Grid::new(16);
        let mut data = payload();
        data["timestamp"] = serde_json::json!(-1.0);
        assert!(parse_observation(&grid, &data).is_err());
    }

    #[test]
    fn negative_queen_energy_is_rejected() {
        let grid = Grid::new(16);
        let mut data = payload();
        data["queenEnergy"]["current"] = serde_json::json!(-5.0);
        assert!(parse_observation(&grid, &data).is_err());
    }

    #[test]
    fn spawn_result_defaults_cover_the_simulator() {
        let result = parse_spawn_result(&serde_json::json!({"success": false})).unwrap();
        assert!(!result.success);
        assert!(result.territory_id == "sim-territory");
        let ok = parse_spawn_result(&serde_json::json!({})).unwrap();
        assert!(ok.success);
    }
}
