use crate::gate::Decision;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

/// Rolling counters for the dashboard. Every producer owns its own
/// counters (relaxed single-writer updates), readers are lock-free, and
/// only eventual consistency is promised.
#[derive(Debug, Default)]
pub struct Dashboard {
    observations: AtomicU64,
    skipped: AtomicU64,
    sent: AtomicU64,
    waited: AtomicU64,
    correct_waits: AtomicU64,
    should_spawns: AtomicU64,
    experiences: AtomicU64,
    resolved_rewards: AtomicU64,
    training_steps: AtomicU64,
    model_version: AtomicU64,
    loss_ema: AtomicU32,
    samples_per_sec: AtomicU32,
}

/// smoothing factor for the published loss EMA
const EMA_ALPHA: f32 = 0.05;

impl Dashboard {
    pub fn record_observation(&self) {
        self.observations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skip(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decision(&self, decision: Decision) {
        let counter = match decision {
            Decision::Send => &self.sent,
            Decision::Wait => &self.waited,
            Decision::CorrectWait => &self.correct_waits,
            Decision::ShouldSpawn => &self.should_spawns,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_experience(&self) {
        self.experiences.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_resolved_reward(&self) {
        self.resolved_rewards.fetch_add(1, Ordering::Relaxed);
    }

    /// called by the trainer after each committed step
    pub fn record_training_step(&self, loss: f32, version: u64, samples_per_sec: f32) {
        self.training_steps.fetch_add(1, Ordering::Relaxed);
        self.model_version.store(version, Ordering::Relaxed);
        let previous = f32::from_bits(self.loss_ema.load(Ordering::Relaxed));
        let ema = if self.training_steps.load(Ordering::Relaxed) <= 1 {
            loss
        } else {
            previous + EMA_ALPHA * (loss - previous)
        };
        self.loss_ema.store(ema.to_bits(), Ordering::Relaxed);
        self.samples_per_sec
            .store(samples_per_sec.to_bits(), Ordering::Relaxed);
    }

    pub fn set_model_version(&self, version: u64) {
        self.model_version.store(version, Ordering::Relaxed);
    }

    pub fn model_version(&self) -> u64 {
        self.model_version.load(Ordering::Relaxed)
    }

    pub fn training_steps(&self) -> u64 {
        self.training_steps.load(Ordering::Relaxed)
    }

    pub fn loss_ema(&self) -> f32 {
        f32::from_bits(self.loss_ema.load(Ordering::Relaxed))
    }

    pub fn snapshot(&self, buffer_fill: f32) -> serde_json::Value {
        serde_json::json!({
            "observations": self.observations.load(Ordering::Relaxed),
            "skipped": self.skipped.load(Ordering::Relaxed),
            "decisions": {
                "SEND": self.sent.load(Ordering::Relaxed),
                "WAIT": self.waited.load(Ordering::Relaxed),
                "CORRECT_WAIT": self.correct_waits.load(Ordering::Relaxed),
                "SHOULD_SPAWN": self.should_spawns.load(Ordering::Relaxed),
            },
            "experiences": self.experiences.load(Ordering::Relaxed),
            "resolved_rewards": self.resolved_rewards.load(Ordering::Relaxed),
            "training": {
                "steps": self.training_steps.load(Ordering::Relaxed),
                "loss_ema": self.loss_ema(),
                "samples_per_sec": f32::from_bits(self.samples_per_sec.load(Ordering::Relaxed)),
                "buffer_fill": buffer_fill,
            },
            "model_version": self.model_version.load(Ordering::Relaxed),
        })
    }
}
