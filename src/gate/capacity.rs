use super::config::GateConfig;
use crate::observation::SpawnType;
use crate::Energy;

pub fn spawn_cost(config: &GateConfig, spawn_type: SpawnType) -> Energy {
    match spawn_type {
        SpawnType::Energy => config.energy_cost,
        SpawnType::Combat => config.combat_cost,
    }
}

/// Capacity check: a spawn the queen cannot pay for is not a candidate
/// at all, so the cost function reports it as −∞ expected reward.
pub fn has_capacity(config: &GateConfig, spawn_type: SpawnType, available: Energy) -> bool {
    available >= spawn_cost(config, spawn_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn costs_per_type() {
        let config = GateConfig::default();
        assert!(spawn_cost(&config, SpawnType::Energy) == 15.0);
        assert!(spawn_cost(&config, SpawnType::Combat) == 25.0);
    }

    #[test]
    fn boundary_energy_is_sufficient() {
        let config = GateConfig::default();
        assert!(has_capacity(&config, SpawnType::Energy, 15.0));
        assert!(has_capacity(&config, SpawnType::Combat, 25.0));
        assert!(!has_capacity(&config, SpawnType::Energy, 14.99));
        assert!(!has_capacity(&config, SpawnType::Combat, 20.0));
    }
}
