use super::config::GateConfig;
use super::cost::Components;
use super::cost::CostFunction;
use super::exploration::ExplorationTracker;
use super::GateView;
use crate::grid::Grid;
use crate::observation::SpawnType;
use crate::policy::SpawnDecision;
use crate::Chunk;
use crate::Reward;
use serde::Deserialize;
use serde::Serialize;

/// What the gate tells the client to do with the network's proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    /// NN proposed a spawn and the gate agrees
    Send,
    /// NN proposed a spawn and the gate vetoes it
    Wait,
    /// NN declined to spawn and the gate agrees
    CorrectWait,
    /// NN declined to spawn but the gate found a viable target
    ShouldSpawn,
}

#[derive(Debug, Clone, Serialize)]
pub struct GateDecision {
    pub decision: Decision,
    pub expected_reward: Reward,
    pub reason: &'static str,
    pub components: Components,
    /// the gate's chosen target, which differs from the NN's on SHOULD_SPAWN
    pub chunk: Chunk,
    pub spawn_type: Option<SpawnType>,
}

#[derive(Debug, Default)]
struct GateStats {
    evaluations: u64,
    sent: u64,
    waited: u64,
    correct_waits: u64,
    should_spawns: u64,
}

/// The deterministic check between the policy network and the game.
/// Scores the NN's candidate against the hand-crafted cost function and
/// either passes it through, vetoes it, or overrides a no-spawn when
/// the board clearly offers a target.
pub struct DecisionGate {
    config: GateConfig,
    cost: CostFunction,
    tracker: ExplorationTracker,
    stats: GateStats,
}

impl DecisionGate {
    pub fn new(grid: Grid, config: GateConfig) -> Self {
        let chunks = grid.chunks();
        Self {
            config,
            cost: CostFunction::new(grid),
            tracker: ExplorationTracker::new(chunks),
            stats: GateStats::default(),
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// runtime reload target; the caller validates before swapping
    pub fn set_config(&mut self, config: GateConfig) {
        self.config = config;
    }

    /// note an executed spawn so the exploration bonus collapses there
    pub fn record_spawn(&mut self, chunk: Chunk) {
        self.tracker.record_spawn(chunk);
    }

    pub fn evaluate(&mut self, view: &GateView, candidate: &SpawnDecision) -> GateDecision {
        self.tracker.advance();
        self.stats.evaluations += 1;
        let decision = self.decide(view, candidate);
        match decision.decision {
            Decision::Send => self.stats.sent += 1,
            Decision::Wait => self.stats.waited += 1,
            Decision::CorrectWait => self.stats.correct_waits += 1,
            Decision::ShouldSpawn => self.stats.should_spawns += 1,
        }
        decision
    }

    fn decide(&mut self, view: &GateView, candidate: &SpawnDecision) -> GateDecision {
        // a dead territory needs no cost function
        if view.workers.is_empty() && view.protectors.is_empty() {
            return self.correct_wait("no_activity");
        }
        if candidate.is_spawn() {
            self.gate_spawn(view, candidate)
        } else if !self.config.enabled {
            self.correct_wait("gate_disabled")
        } else {
            self.gate_no_spawn(view)
        }
    }

    fn gate_spawn(&mut self, view: &GateView, candidate: &SpawnDecision) -> GateDecision {
        let spawn_type = candidate.spawn_type.unwrap_or(SpawnType::Energy);
        let components = self
            .cost
            .evaluate(&self.config, view, candidate.chunk, spawn_type, &self.tracker);
        if !components.capacity_valid {
            return GateDecision {
                decision: Decision::Wait,
                expected_reward: f32::NEG_INFINITY,
                reason: "insufficient_energy",
                components,
                chunk: candidate.chunk,
                spawn_type: Some(spawn_type),
            };
        }
        let expected = components.expected(&self.config);
        if expected.is_nan() {
            log::error!(
                "gate produced NaN for chunk {} with {} protectors",
                candidate.chunk,
                view.protectors.len(),
            );
            return GateDecision {
                decision: Decision::Wait,
                expected_reward: 0.0,
                reason: "gate_error",
                components,
                chunk: candidate.chunk,
                spawn_type: Some(spawn_type),
            };
        }
        if !self.config.enabled {
            return GateDecision {
                decision: Decision::Send,
                expected_reward: expected,
                reason: "gate_disabled",
                components,
                chunk: candidate.chunk,
                spawn_type: Some(spawn_type),
            };
        }
        if candidate.confidence >= self.config.confidence_override {
            return GateDecision {
                decision: Decision::Send,
                expected_reward: expected,
                reason: "confidence_override",
                components,
                chunk: candidate.chunk,
                spawn_type: Some(spawn_type),
            };
        }
        if expected > self.config.send_threshold {
            GateDecision {
                decision: Decision::Send,
                expected_reward: expected,
                reason: "cost_function",
                components,
                chunk: candidate.chunk,
                spawn_type: Some(spawn_type),
            }
        } else {
            GateDecision {
                decision: Decision::Wait,
                expected_reward: expected,
                reason: if components.survival < self.config.danger_survival {
                    "dangerous"
                } else {
                    "low_expected_reward"
                },
                components,
                chunk: candidate.chunk,
                spawn_type: Some(spawn_type),
            }
        }
    }

    /// The NN declined to spawn: search every chunk for the best
    /// alternative and override when the forgone opportunity is large.
    /// The search uses the cheaper energy type, since a board that
    /// cannot afford that cannot afford anything.
    fn gate_no_spawn(&mut self, view: &GateView) -> GateDecision {
        let best = self
            .cost
            .best_alternative(&self.config, view, SpawnType::Energy, &self.tracker);
        match best {
            Some((chunk, components, score)) if score > self.config.should_spawn_threshold => {
                GateDecision {
                    decision: Decision::ShouldSpawn,
                    expected_reward: -score,
                    reason: "missed_opportunity",
                    components,
                    chunk,
                    spawn_type: Some(SpawnType::Energy),
                }
            }
            _ => self.correct_wait("no_viable_target"),
        }
    }

    fn correct_wait(&self, reason: &'static str) -> GateDecision {
        GateDecision {
            decision: Decision::CorrectWait,
            expected_reward: self.config.correct_wait_reward,
            reason,
            components: Components::idle(),
            chunk: -1,
            spawn_type: None,
        }
    }

    pub fn statistics(&self) -> serde_json::Value {
        let total = self.stats.evaluations.max(1) as f64;
        serde_json::json!({
            "evaluations": self.stats.evaluations,
            "decisions": {
                "SEND": self.stats.sent,
                "WAIT": self.stats.waited,
                "CORRECT_WAIT": self.stats.correct_waits,
                "SHOULD_SPAWN": self.stats.should_spawns,
            },
            "send_rate": self.stats.sent as f64 / total,
            "override_rate": self.stats.should_spawns as f64 / total,
            "config": serde_json::to_value(&self.config).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::NnDecision;

    fn gate() -> DecisionGate {
        let config = GateConfig {
            weight_exploration: 0.0,
            ..GateConfig::default()
        };
        DecisionGate::new(Grid::new(16), config)
    }

    fn spawn_candidate(chunk: Chunk, confidence: f32) -> SpawnDecision {
        SpawnDecision {
            chunk,
            spawn_type: Some(SpawnType::Energy),
            confidence,
            nn_decision: NnDecision::Spawn,
        }
    }

    fn no_spawn_candidate() -> SpawnDecision {
        SpawnDecision {
            chunk: -1,
            spawn_type: None,
            confidence: 0.5,
            nn_decision: NnDecision::NoSpawn,
        }
    }

    fn view(workers: Vec<Chunk>, protectors: Vec<Chunk>, energy: f32) -> GateView {
        GateView {
            workers,
            protectors,
            hive: 136,
            queen_energy: energy,
        }
    }

    #[test]
    fn empty_world_waits_correctly() {
        let mut gate = gate();
        let decision = gate.evaluate(&view(vec![], vec![], 50.0), &spawn_candidate(50, 0.6));
        assert!(decision.decision == Decision::CorrectWait);
        assert!(decision.reason == "no_activity");
        assert!(decision.expected_reward > 0.0);
        assert!(decision.chunk == -1);
    }

    #[test]
    fn obvious_good_spawn_is_sent() {
        let mut gate = gate();
        let decision = gate.evaluate(&view(vec![50], vec![], 50.0), &spawn_candidate(51, 0.6));
        assert!(decision.decision == Decision::Send);
        assert!(decision.components.survival >= 0.999);
        assert!(decision.components.disruption > 0.5);
        assert!(decision.expected_reward > 0.0);
    }

    #[test]
    fn dangerous_spawn_is_vetoed() {
        let mut gate = gate();
        let decision = gate.evaluate(&view(vec![50], vec![50], 50.0), &spawn_candidate(50, 0.3));
        assert!(decision.decision == Decision::Wait);
        assert!(decision.reason == "dangerous");
        assert!(decision.components.survival == 0.0);
    }

    #[test]
    fn high_confidence_overrides_danger() {
        let mut gate = gate();
        let decision = gate.evaluate(&view(vec![50], vec![50], 50.0), &spawn_candidate(50, 0.97));
        assert!(decision.decision == Decision::Send);
        assert!(decision.reason == "confidence_override");
    }

    #[test]
    fn insufficient_energy_always_waits() {
        let mut gate = gate();
        let decision = gate.evaluate(&view(vec![50], vec![], 10.0), &spawn_candidate(51, 0.97));
        assert!(decision.decision == Decision::Wait);
        assert!(decision.reason == "insufficient_energy");
        assert!(decision.expected_reward == f32::NEG_INFINITY);
    }

    #[test]
    fn missed_opportunity_triggers_should_spawn() {
        let mut gate = gate();
        let decision = gate.evaluate(&view(vec![100, 101], vec![], 50.0), &no_spawn_candidate());
        assert!(decision.decision == Decision::ShouldSpawn);
        assert!(decision.expected_reward < 0.0);
        let grid = Grid::new(16);
        let near = grid.distance(decision.chunk, 100).min(grid.distance(decision.chunk, 101));
        assert!(near <= 1.5);
    }

    #[test]
    fn genuine_no_spawn_is_confirmed() {
        let mut gate = gate();
        // a protector camping the lone worker leaves no viable target
        let decision = gate.evaluate(&view(vec![50], vec![50, 51, 49, 34, 66], 16.0), &no_spawn_candidate());
        assert!(decision.decision == Decision::CorrectWait);
        assert!(decision.expected_reward > 0.0);
    }

    #[test]
    fn disabled_gate_rubber_stamps_spawns() {
        let mut gate = gate();
        let mut config = gate.config().clone();
        config.enabled = false;
        gate.set_config(config);
        let decision = gate.evaluate(&view(vec![], vec![50], 50.0), &spawn_candidate(51, 0.1));
        assert!(decision.decision == Decision::Send);
        assert!(decision.reason == "gate_disabled");
    }

    #[test]
    fn statistics_track_decisions() {
        let mut gate = gate();
        gate.evaluate(&view(vec![50], vec![], 50.0), &spawn_candidate(51, 0.6));
        gate.evaluate(&view(vec![], vec![], 50.0), &no_spawn_candidate());
        let stats = gate.statistics();
        assert!(stats["evaluations"] == 2);
        assert!(stats["decisions"]["SEND"] == 1);
        assert!(stats["decisions"]["CORRECT_WAIT"] == 1);
    }
}
