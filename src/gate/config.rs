use crate::errors::EngineError;
use crate::Energy;
use serde::Deserialize;
use serde::Serialize;

/// Tunables for the decision gate and its cost function. Loaded from
/// the `gate` section of the YAML config and hot-reloadable at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub enabled: bool,

    /// protectors closer than this kill a parasite outright
    pub kill_range: f32,
    /// beyond this distance a protector poses no threat
    pub safe_range: f32,
    /// λ of the exponential threat falloff between the two ranges
    pub threat_decay: f32,

    pub energy_cost: Energy,
    pub combat_cost: Energy,

    pub weight_survival: f32,
    pub weight_disruption: f32,
    pub weight_location: f32,
    pub weight_exploration: f32,

    pub exploration_ceiling: f32,
    /// ticks for a chunk's exploration bonus to recover fully
    pub exploration_recovery: u64,

    pub send_threshold: f32,
    pub should_spawn_threshold: f32,
    pub correct_wait_reward: f32,
    pub confidence_override: f32,
    /// survival below this labels a veto as "dangerous"
    pub danger_survival: f32,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            kill_range: 2.0,
            safe_range: 8.0,
            threat_decay: 0.5,
            energy_cost: 15.0,
            combat_cost: 25.0,
            weight_survival: 0.4,
            weight_disruption: 0.5,
            weight_location: 0.1,
            weight_exploration: 0.05,
            exploration_ceiling: 0.1,
            exploration_recovery: 200,
            send_threshold: 0.25,
            should_spawn_threshold: 0.5,
            correct_wait_reward: 0.1,
            confidence_override: 0.9,
            danger_survival: 0.3,
        }
    }
}

impl GateConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        let check = |ok: bool, name: &str, reason: &str| {
            if ok {
                Ok(())
            } else {
                Err(EngineError::Config {
                    name: name.to_string(),
                    reason: reason.to_string(),
                })
            }
        };
        check(self.kill_range >= 0.0, "gate.kill_range", "must be non-negative")?;
        check(
            self.safe_range > self.kill_range,
            "gate.safe_range",
            "must exceed kill_range",
        )?;
        check(self.threat_decay > 0.0, "gate.threat_decay", "must be positive")?;
        check(self.energy_cost > 0.0, "gate.energy_cost", "must be positive")?;
        check(self.combat_cost > 0.0, "gate.combat_cost", "must be positive")?;
        check(
            self.weight_survival >= 0.0
                && self.weight_disruption >= 0.0
                && self.weight_location >= 0.0
                && self.weight_exploration >= 0.0,
            "gate.weights",
            "must be non-negative",
        )?;
        check(
            (0.0..=1.0).contains(&self.confidence_override),
            "gate.confidence_override",
            "must be in [0, 1]",
        )?;
        check(
            self.exploration_recovery > 0,
            "gate.exploration_recovery",
            "must be positive",
        )?;
        Ok(())
    }
}
