use crate::errors::EngineError;
use crate::Chunk;
use crate::Energy;
use serde::Deserialize;
use serde::Serialize;

/// Knobs for the deterministic training environment. The grid here is
/// the same coarse chunk model the gate reasons over; none of this
/// pretends to reproduce real game-engine physics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub grid_size: usize,
    pub num_workers: usize,
    pub num_protectors: usize,
    pub mining_spots: Vec<Chunk>,
    pub base_chunk: Chunk,
    pub queen_chunk: Chunk,

    pub queen_start_energy: Energy,
    pub queen_max_energy: Energy,
    pub queen_energy_regen: Energy,
    pub player_start_energy: f32,
    pub player_start_minerals: f32,
    pub player_energy_regen: f32,

    pub energy_parasite_cost: Energy,
    pub combat_parasite_cost: Energy,
    /// player energy drained per energy parasite per tick
    pub parasite_energy_drain: f32,
    pub parasite_lifetime: u64,

    pub flee_radius: f32,
    pub flee_duration: u32,
    pub aggro_radius: f32,
    pub mining_rate: f32,
    pub mining_duration: u32,

    pub tick_interval_ms: u64,
    pub turbo_mode: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            grid_size: 16,
            num_workers: 4,
            num_protectors: 2,
            mining_spots: vec![18, 29, 45, 67, 123, 189, 234],
            base_chunk: 17,
            queen_chunk: 136,
            queen_start_energy: 50.0,
            queen_max_energy: 100.0,
            queen_energy_regen: 1.0,
            player_start_energy: 100.0,
            player_start_minerals: 50.0,
            player_energy_regen: 0.5,
            energy_parasite_cost: 15.0,
            combat_parasite_cost: 25.0,
            parasite_energy_drain: 0.5,
            parasite_lifetime: 30,
            flee_radius: 2.0,
            flee_duration: 5,
            aggro_radius: 4.0,
            mining_rate: 1.0,
            mining_duration: 10,
            tick_interval_ms: 250,
            turbo_mode: false,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        let chunks = (self.grid_size * self.grid_size) as Chunk;
        let bounded = |chunk: Chunk| chunk >= 0 && chunk < chunks;
        if self.grid_size < 2 {
            return Err(EngineError::Config {
                name: "sim.grid_size".to_string(),
                reason: "must be at least 2".to_string(),
            });
        }
        if self.mining_spots.is_empty() || !self.mining_spots.iter().all(|&s| bounded(s)) {
            return Err(EngineError::Config {
                name: "sim.mining_spots".to_string(),
                reason: "must be non-empty and inside the grid".to_string(),
            });
        }
        if !bounded(self.base_chunk) || !bounded(self.queen_chunk) {
            return Err(EngineError::Config {
                name: "sim.base_chunk".to_string(),
                reason: "base and queen chunks must be inside the grid".to_string(),
            });
        }
        if self.queen_max_energy < self.queen_start_energy {
            return Err(EngineError::Config {
                name: "sim.queen_max_energy".to_string(),
                reason: "must be at least the start energy".to_string(),
            });
        }
        Ok(())
    }

    pub fn parasite_cost(&self, kind: crate::observation::SpawnType) -> Energy {
        match kind {
            crate::observation::SpawnType::Energy => self.energy_parasite_cost,
            crate::observation::SpawnType::Combat => self.combat_parasite_cost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn out_of_grid_spots_rejected() {
        let config = SimConfig {
            mining_spots: vec![300],
            ..SimConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
