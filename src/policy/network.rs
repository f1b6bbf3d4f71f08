use super::decision::NnDecision;
use super::decision::SpawnDecision;
use super::layer::Dense;
use crate::observation::SpawnType;
use crate::Chunk;
use crate::Probability;
use crate::Reward;
use crate::FEATURES;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::Deserialize;
use serde::Serialize;

const HIDDEN1: usize = 32;
const HIDDEN2: usize = 16;
const CHUNK_EXPAND: usize = 32;

/// loss weights from the two-head compile config: chunk cross-entropy
/// dominates, the binary type head contributes half
const TYPE_LOSS_WEIGHT: f32 = 0.5;
const EPS: f32 = 1e-8;

/// Split-head policy network.
///
/// 28 → 32 ReLU → 16 ReLU shared trunk, fanning out into a chunk head
/// (16 → 32 ReLU → G²+1 softmax) over spawn locations plus the explicit
/// no-spawn slot, and a type head (16 → 1 sigmoid) choosing combat vs
/// energy. Roughly 10k parameters for the default 16×16 grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyNetwork {
    version: u64,
    outputs: usize,
    hidden1: Dense,
    hidden2: Dense,
    chunk_expand: Dense,
    chunk_out: Dense,
    type_out: Dense,
}

#[derive(Debug, Clone, Copy)]
pub struct TrainLoss {
    pub chunk_loss: f32,
    pub type_loss: f32,
    pub scaled_lr: f32,
}

impl TrainLoss {
    pub fn total(&self) -> f32 {
        self.chunk_loss + TYPE_LOSS_WEIGHT * self.type_loss
    }
}

struct Forward {
    h1_pre: Vec<f32>,
    h1: Vec<f32>,
    h2_pre: Vec<f32>,
    h2: Vec<f32>,
    ce_pre: Vec<f32>,
    ce: Vec<f32>,
    probs: Vec<f32>,
    type_p: f32,
}

impl PolicyNetwork {
    /// `outputs` must be G²+1 for the configured grid
    pub fn seeded(outputs: usize, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        Self {
            version: 0,
            outputs,
            hidden1: Dense::he(FEATURES, HIDDEN1, &mut rng),
            hidden2: Dense::he(HIDDEN1, HIDDEN2, &mut rng),
            chunk_expand: Dense::he(HIDDEN2, CHUNK_EXPAND, &mut rng),
            chunk_out: Dense::xavier(CHUNK_EXPAND, outputs, &mut rng),
            type_out: Dense::xavier(HIDDEN2, 1, &mut rng),
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn bump_version(&mut self) {
        self.version += 1;
    }

    pub fn outputs(&self) -> usize {
        self.outputs
    }

    /// the tensor slot that encodes the no-spawn action
    pub fn no_spawn_slot(&self) -> usize {
        self.outputs - 1
    }

    pub fn parameters(&self) -> usize {
        self.hidden1.parameters()
            + self.hidden2.parameters()
            + self.chunk_expand.parameters()
            + self.chunk_out.parameters()
            + self.type_out.parameters()
    }

    pub fn is_finite(&self) -> bool {
        self.hidden1.is_finite()
            && self.hidden2.is_finite()
            && self.chunk_expand.is_finite()
            && self.chunk_out.is_finite()
            && self.type_out.is_finite()
    }

    fn forward(&self, features: &[f32]) -> Forward {
        let mut h1_pre = vec![0.0; HIDDEN1];
        self.hidden1.forward(features, &mut h1_pre);
        let h1 = relu(&h1_pre);
        let mut h2_pre = vec![0.0; HIDDEN2];
        self.hidden2.forward(&h1, &mut h2_pre);
        let h2 = relu(&h2_pre);
        let mut ce_pre = vec![0.0; CHUNK_EXPAND];
        self.chunk_expand.forward(&h2, &mut ce_pre);
        let ce = relu(&ce_pre);
        let mut logits = vec![0.0; self.outputs];
        self.chunk_out.forward(&ce, &mut logits);
        let probs = softmax(&logits);
        let mut type_pre = [0.0];
        self.type_out.forward(&h2, &mut type_pre);
        let type_p = sigmoid(type_pre[0]);
        Forward {
            h1_pre,
            h1,
            h2_pre,
            h2,
            ce_pre,
            ce,
            probs,
            type_p,
        }
    }

    /// distribution over G²+1 chunk slots plus the spawn-type probability
    pub fn predict(&self, features: &[f32]) -> (Vec<Probability>, Probability) {
        let pass = self.forward(features);
        (pass.probs, pass.type_p)
    }

    pub fn get_spawn_decision(&self, features: &[f32]) -> SpawnDecision {
        let (probs, type_p) = self.predict(features);
        let slot = argmax(&probs);
        let confidence = probs[slot];
        if slot == self.no_spawn_slot() {
            SpawnDecision {
                chunk: -1,
                spawn_type: None,
                confidence,
                nn_decision: NnDecision::NoSpawn,
            }
        } else {
            SpawnDecision {
                chunk: slot as Chunk,
                spawn_type: Some(if type_p >= 0.5 {
                    SpawnType::Combat
                } else {
                    SpawnType::Energy
                }),
                confidence,
                nn_decision: NnDecision::Spawn,
            }
        }
    }

    /// One reward-shaped update. A positive reward pulls the chunk
    /// distribution toward a one-hot on the action taken (-1 maps to
    /// the no-spawn slot) and the type head toward the action's type; a
    /// negative reward bleeds probability off the action and flips the
    /// type target. The effective learning rate scales with |reward|.
    pub fn train_with_reward(
        &mut self,
        features: &[f32],
        chunk: Chunk,
        spawn_type: Option<SpawnType>,
        reward: Reward,
        learning_rate: f32,
    ) -> TrainLoss {
        let slot = if chunk < 0 {
            self.no_spawn_slot()
        } else {
            (chunk as usize).min(self.no_spawn_slot())
        };
        let pass = self.forward(features);

        let chunk_target = if reward > 0.0 {
            let mut target = vec![0.0; self.outputs];
            target[slot] = 1.0;
            target
        } else {
            let mut target = pass.probs.clone();
            target[slot] = (target[slot] - reward.abs() * 0.5).max(0.0);
            let sum: f32 = target.iter().sum();
            target.iter_mut().for_each(|t| *t /= sum + EPS);
            target
        };
        let mut type_target = match spawn_type {
            Some(SpawnType::Combat) => 1.0,
            _ => 0.0,
        };
        if reward < 0.0 {
            type_target = 1.0 - type_target;
        }

        let lr = learning_rate * reward.abs();
        let chunk_loss = cross_entropy(&pass.probs, &chunk_target);
        let type_loss = binary_cross_entropy(pass.type_p, type_target);

        // softmax + cross-entropy collapses to probs - target at the logits
        let d_logits: Vec<f32> = pass
            .probs
            .iter()
            .zip(chunk_target.iter())
            .map(|(p, t)| p - t)
            .collect();
        let d_ce = self.chunk_out.backward(&pass.ce, &d_logits, lr);
        let d_ce_pre = relu_grad(&d_ce, &pass.ce_pre);
        let d_h2_chunk = self.chunk_expand.backward(&pass.h2, &d_ce_pre, lr);

        let d_type = [TYPE_LOSS_WEIGHT * (pass.type_p - type_target)];
        let d_h2_type = self.type_out.backward(&pass.h2, &d_type, lr);

        let d_h2: Vec<f32> = d_h2_chunk
            .iter()
            .zip(d_h2_type.iter())
            .map(|(a, b)| a + b)
            .collect();
        let d_h2_pre = relu_grad(&d_h2, &pass.h2_pre);
        let d_h1 = self.hidden2.backward(&pass.h1, &d_h2_pre, lr);
        let d_h1_pre = relu_grad(&d_h1, &pass.h1_pre);
        self.hidden1.backward(features, &d_h1_pre, lr);

        TrainLoss {
            chunk_loss,
            type_loss,
            scaled_lr: lr,
        }
    }

    pub fn save(&self, path: &std::path::Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let file = std::fs::File::create(path)?;
        serde_json::to_writer(std::io::BufWriter::new(file), self)?;
        log::debug!("saved weights v{} to {}", self.version, path.display());
        Ok(())
    }

    /// Load persisted weights. A file whose chunk-head width disagrees
    /// with the configured grid is rejected so the policy head always
    /// stays in lock-step with G²+1.
    pub fn load(path: &std::path::Path, outputs: usize) -> anyhow::Result<Self> {
        let file = std::fs::File::open(path)?;
        let net: Self = serde_json::from_reader(std::io::BufReader::new(file))?;
        anyhow::ensure!(
            net.outputs == outputs,
            "persisted weights have {} outputs, grid wants {}",
            net.outputs,
            outputs,
        );
        anyhow::ensure!(net.is_finite(), "persisted weights contain non-finite values");
        Ok(net)
    }
}

fn relu(pre: &[f32]) -> Vec<f32> {
    pre.iter().map(|v| v.max(0.0)).collect()
}

fn relu_grad(grad: &[f32], pre: &[f32]) -> Vec<f32> {
    grad.iter()
        .zip(pre.iter())
        .map(|(g, p)| if *p > 0.0 { *g } else { 0.0 })
        .collect()
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().cloned().fold(f32::MIN, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

fn argmax(values: &[f32]) -> usize {
    values
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).expect("finite probabilities"))
        .map(|(i, _)| i)
        .expect("non-empty distribution")
}

fn cross_entropy(probs: &[f32], target: &[f32]) -> f32 {
    -target
        .iter()
        .zip(probs.iter())
        .map(|(t, p)| t * (p + EPS).ln())
        .sum::<f32>()
}

fn binary_cross_entropy(p: f32, t: f32) -> f32 {
    -(t * (p + EPS).ln() + (1.0 - t) * (1.0 - p + EPS).ln())
}
