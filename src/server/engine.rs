use super::envelope::Envelope;
use super::schema;
use crate::config::AppConfig;
use crate::errors::EngineError;
use crate::features::FeatureExtractor;
use crate::gate::Decision;
use crate::gate::DecisionGate;
use crate::gate::GateConfig;
use crate::gate::GateView;
use crate::gate::PreprocessGate;
use crate::grid::Grid;
use crate::metrics::Dashboard;
use crate::observation::Observation;
use crate::observation::SpawnType;
use crate::policy::PolicyHandle;
use crate::policy::PolicyNetwork;
use crate::replay::Experience;
use crate::replay::ReplayBuffer;
use crate::reward::RewardCalculator;
use crate::trainer::ContinuousTrainer;
use crate::Chunk;
use crate::Reward;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// penalty written into the pending experience when the client reports
/// a spawn it could not execute
const FAILED_SPAWN_PENALTY: Reward = -0.5;

/// seed for fresh weights when nothing is persisted
const WEIGHT_SEED: u64 = 0x5eed;

/// what we remember about the last decision per territory, to settle
/// its pending experience when the follow-up observation arrives
struct SpawnContext {
    observation: Observation,
    chunk: Chunk,
    spawn_type: Option<SpawnType>,
    executed: bool,
    expected: Reward,
}

/// The inference-and-learning facade behind the message handler: one
/// observation in, one gate decision out, with the replay buffer and
/// the background trainer hanging off the side.
pub struct Engine {
    config: AppConfig,
    grid: Grid,
    extractor: FeatureExtractor,
    preprocess: PreprocessGate,
    gate: Mutex<DecisionGate>,
    policy: Arc<PolicyHandle>,
    buffer: Arc<ReplayBuffer>,
    rewards: RewardCalculator,
    metrics: Arc<Dashboard>,
    trainer: ContinuousTrainer,
    contexts: Mutex<HashMap<String, SpawnContext>>,
}

impl Engine {
    pub fn new(config: AppConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let grid = Grid::new(config.grid.per_axis);
        let net = match PolicyNetwork::load(&config.training.weights_path, grid.policy_outputs()) {
            Ok(net) => {
                log::info!(
                    "loaded weights v{} from {}",
                    net.version(),
                    config.training.weights_path.display(),
                );
                net
            }
            Err(e) => {
                log::warn!("starting with fresh weights: {}", e);
                PolicyNetwork::seeded(grid.policy_outputs(), WEIGHT_SEED)
            }
        };
        log::info!("policy network ready: {} parameters", net.parameters());
        let metrics = Arc::new(Dashboard::default());
        metrics.set_model_version(net.version());
        let policy = Arc::new(PolicyHandle::new(net));
        let buffer = Arc::new(ReplayBuffer::new(
            config.training.buffer_capacity,
            Duration::from_millis(config.training.lock_timeout_ms),
            config.training.seed,
        ));
        let trainer = ContinuousTrainer::new(
            config.training.clone(),
            policy.clone(),
            buffer.clone(),
            metrics.clone(),
        );
        Ok(Self {
            grid,
            extractor: FeatureExtractor::new(grid),
            preprocess: PreprocessGate::default(),
            gate: Mutex::new(DecisionGate::new(grid, config.gate.clone())),
            policy,
            buffer,
            rewards: RewardCalculator::default(),
            metrics,
            trainer,
            contexts: Mutex::new(HashMap::new()),
            config,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn start(&self) {
        self.trainer.start();
    }

    pub fn shutdown(&self) {
        self.trainer.stop();
    }

    /// runtime gate-config swap, used by the file watcher
    pub fn reload_gate(&self, config: GateConfig) {
        self.gate.lock().set_config(config);
        log::info!("gate configuration reloaded");
    }

    /// The per-observation pipeline: settle the territory's pending
    /// experience, early-skip dead boards, extract features, run the
    /// policy, gate the candidate, and record the new pending row.
    pub fn handle_observation(&self, envelope: &Envelope) -> Envelope {
        self.metrics.record_observation();
        let obs = match schema::parse_observation(&self.grid, &envelope.data) {
            Ok(obs) => obs,
            Err(e) => return envelope.error(&e),
        };
        self.settle_pending(&obs);

        let pre = self.preprocess.evaluate(&obs);
        if pre.skip {
            self.metrics.record_skip();
            let reward = self.gate.lock().config().correct_wait_reward;
            return envelope.reply(
                "observation_response",
                serde_json::json!({
                    "spawnChunk": -1,
                    "spawnType": null,
                    "confidence": 1.0,
                    "nnDecision": "no_spawn",
                    "gateDecision": Decision::CorrectWait,
                    "expectedReward": reward,
                    "reason": pre.reason,
                }),
            );
        }

        let features = match self.extractor.extract(&obs) {
            Ok(features) => features,
            Err(e) => return envelope.error(&e),
        };
        let net = self.policy.current();
        let candidate = net.get_spawn_decision(&features);
        let view = GateView::from(&obs);
        let decision = {
            let mut gate = self.gate.lock();
            let decision = gate.evaluate(&view, &candidate);
            if decision.decision == Decision::Send {
                gate.record_spawn(decision.chunk);
            }
            decision
        };
        self.metrics.record_decision(decision.decision);

        // insufficient capacity leaves no trainable signal behind
        if decision.expected_reward.is_finite() {
            let experience = Experience {
                features: features.to_vec(),
                chunk: candidate.chunk,
                spawn_type: candidate.spawn_type,
                expected: decision.expected_reward,
                actual: None,
                territory: obs.territory_id.clone(),
                timestamp: obs.timestamp,
                model_version: net.version(),
            };
            match self.buffer.add(experience) {
                Ok(()) => {
                    self.metrics.record_experience();
                    self.contexts.lock().insert(
                        obs.territory_id.clone(),
                        SpawnContext {
                            chunk: decision.chunk,
                            spawn_type: decision.spawn_type,
                            executed: decision.decision == Decision::Send,
                            expected: decision.expected_reward,
                            observation: obs.clone(),
                        },
                    );
                }
                Err(e) => log::warn!("experience not recorded: {}", e),
            }
        }

        let expected = if decision.expected_reward.is_finite() {
            serde_json::json!(decision.expected_reward)
        } else {
            serde_json::Value::Null
        };
        envelope.reply(
            "observation_response",
            serde_json::json!({
                "spawnChunk": decision.chunk,
                "spawnType": decision.spawn_type,
                "confidence": candidate.confidence,
                "nnDecision": candidate.nn_decision,
                "gateDecision": decision.decision,
                "expectedReward": expected,
                "reason": decision.reason,
                "components": decision.components,
                "modelVersion": net.version(),
            }),
        )
    }

    /// Close out the previous decision for this territory. Executed
    /// spawns settle against ground truth from the new observation;
    /// everything else settles with the gate's expected reward, the
    /// only signal a never-executed action will ever have.
    fn settle_pending(&self, obs: &Observation) {
        let context = self.contexts.lock().remove(&obs.territory_id);
        if let Some(context) = context {
            let reward = if context.executed {
                self.rewards.actual(
                    &self.grid,
                    &context.observation,
                    obs,
                    context.chunk,
                    context.spawn_type.unwrap_or(SpawnType::Energy),
                )
            } else {
                context.expected
            };
            match self.buffer.update_pending_reward(&obs.territory_id, reward) {
                Ok(()) => self.metrics.record_resolved_reward(),
                Err(e) => log::warn!("pending not settled for {}: {}", obs.territory_id, e),
            }
        }
    }

    /// A failed spawn cancels the optimistic expectation: the pending
    /// experience settles with a flat penalty instead.
    pub fn handle_spawn_result(&self, envelope: &Envelope) -> Option<Envelope> {
        let result = match schema::parse_spawn_result(&envelope.data) {
            Ok(result) => result,
            Err(e) => return Some(envelope.error(&e)),
        };
        if result.success {
            log::debug!(
                "spawn confirmed at chunk {:?} for {}",
                result.spawn_chunk,
                result.territory_id,
            );
            return None;
        }
        log::info!(
            "spawn failed at chunk {:?} for {}: {}",
            result.spawn_chunk,
            result.territory_id,
            result.reason,
        );
        self.contexts.lock().remove(&result.territory_id);
        match self.buffer.update_pending_reward(&result.territory_id, FAILED_SPAWN_PENALTY) {
            Ok(()) => self.metrics.record_resolved_reward(),
            Err(e) => log::warn!("failed spawn not recorded: {}", e),
        }
        None
    }

    /// `reset_nn` with `{confirm: true}`: fresh weights, empty buffer,
    /// the version clock restarts with the new lineage.
    pub fn handle_reset(&self, envelope: &Envelope) -> Envelope {
        let confirmed = envelope.data.get("confirm").and_then(|v| v.as_bool()) == Some(true);
        if !confirmed {
            return envelope.reply(
                "reset_nn_response",
                serde_json::json!({
                    "status": "confirmation_required",
                    "message": "send with {confirm: true} to confirm reset",
                }),
            );
        }
        let net = PolicyNetwork::seeded(self.grid.policy_outputs(), WEIGHT_SEED);
        let parameters = net.parameters();
        self.policy.publish(net);
        self.contexts.lock().clear();
        if let Err(e) = self.buffer.clear() {
            log::warn!("buffer not cleared on reset: {}", e);
        }
        self.metrics.set_model_version(0);
        log::warn!("policy network reset to fresh weights");
        envelope.reply(
            "reset_nn_response",
            serde_json::json!({
                "status": "reset",
                "modelVersion": 0,
                "parameters": parameters,
            }),
        )
    }

    pub fn gate_stats(&self) -> serde_json::Value {
        let mut stats = self.gate.lock().statistics();
        stats["preprocess"] = self.preprocess.statistics();
        stats
    }

    pub fn training_status(&self) -> serde_json::Value {
        serde_json::json!({
            "status": if self.trainer.is_running() { "active" } else { "stopped" },
            "modelVersion": self.policy.version(),
            "trainingIterations": self.metrics.training_steps(),
            "averageLoss": self.metrics.loss_ema(),
            "bufferSize": self.buffer.len(),
            "isRunning": self.trainer.is_running(),
        })
    }

    pub fn background_training_stats(&self) -> serde_json::Value {
        serde_json::json!({
            "status": if self.trainer.is_running() { "active" } else { "stopped" },
            "model_version": self.policy.version(),
            "is_running": self.trainer.is_running(),
            "buffer": {
                "size": self.buffer.len(),
                "capacity": self.buffer.capacity(),
                "fill_ratio": self.buffer.fill_ratio(),
                "pending": self.buffer.pending_count(),
            },
            "training": self.metrics.snapshot(self.buffer.fill_ratio()),
        })
    }

    pub fn health(&self) -> serde_json::Value {
        serde_json::json!({
            "status": "healthy",
            "modelVersion": self.policy.version(),
            "bufferSize": self.buffer.len(),
            "pendingExperiences": self.buffer.pending_count(),
            "trainerRunning": self.trainer.is_running(),
        })
    }

    #[cfg(test)]
    pub fn buffer(&self) -> &ReplayBuffer {
        &self.buffer
    }

    #[cfg(test)]
    pub fn policy(&self) -> &PolicyHandle {
        &self.policy
    }
}
