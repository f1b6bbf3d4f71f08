use crate::metrics::Dashboard;
use crate::policy::PolicyHandle;
use crate::replay::ReplayBuffer;
use serde::Deserialize;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread::JoinHandle;
use std::time::Duration;
use std::time::Instant;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub enabled: bool,
    pub interval_ms: u64,
    pub min_batch: usize,
    pub batch_size: usize,
    pub learning_rate: f32,
    /// persist weights every this many committed steps
    pub checkpoint_interval: u64,
    pub buffer_capacity: usize,
    pub lock_timeout_ms: u64,
    pub weights_path: PathBuf,
    pub seed: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 100,
            min_batch: 32,
            batch_size: 32,
            learning_rate: 0.01,
            checkpoint_interval: 100,
            buffer_capacity: 10_000,
            lock_timeout_ms: 250,
            weights_path: PathBuf::from("models/queen_policy.json"),
            seed: 7,
        }
    }
}

/// Background trainer. Runs in its own thread of control, talking to
/// the request path only through the replay buffer and the policy
/// snapshot: it clones the live network, steps it on a sampled batch,
/// and publishes the result. A diverged step is discarded whole: the
/// live weights never see it and the model version does not move.
pub struct ContinuousTrainer {
    config: TrainerConfig,
    policy: Arc<PolicyHandle>,
    buffer: Arc<ReplayBuffer>,
    dashboard: Arc<Dashboard>,
    stop: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl ContinuousTrainer {
    pub fn new(
        config: TrainerConfig,
        policy: Arc<PolicyHandle>,
        buffer: Arc<ReplayBuffer>,
        dashboard: Arc<Dashboard>,
    ) -> Self {
        Self {
            config,
            policy,
            buffer,
            dashboard,
            stop: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicBool::new(false)),
            thread: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Idempotent: a second start while running is a no-op.
    pub fn start(&self) {
        if !self.config.enabled {
            log::info!("continuous training disabled by config");
            return;
        }
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        self.stop.store(false, Ordering::SeqCst);
        let config = self.config.clone();
        let policy = self.policy.clone();
        let buffer = self.buffer.clone();
        let dashboard = self.dashboard.clone();
        let stop = self.stop.clone();
        let running = self.running.clone();
        let handle = std::thread::Builder::new()
            .name("continuous-trainer".into())
            .spawn(move || {
                log::info!(
                    "continuous trainer started: interval {}ms, batch {}",
                    config.interval_ms,
                    config.batch_size,
                );
                Self::run(config, policy, buffer, dashboard, stop);
                running.store(false, Ordering::SeqCst);
                log::info!("continuous trainer stopped");
            })
            .expect("spawn trainer thread");
        *self.thread.lock().expect("trainer handle lock") = Some(handle);
    }

    /// Idempotent: signals the loop, then joins. In-flight updates
    /// finish before the thread exits, so the published weights are
    /// always a whole committed step.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.thread.lock().expect("trainer handle lock").take() {
            handle.join().ok();
        }
    }

    fn run(
        config: TrainerConfig,
        policy: Arc<PolicyHandle>,
        buffer: Arc<ReplayBuffer>,
        dashboard: Arc<Dashboard>,
        stop: Arc<AtomicBool>,
    ) {
        let started = Instant::now();
        let mut steps: u64 = 0;
        let mut samples: usize = 0;
        while !stop.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(config.interval_ms));
            if stop.load(Ordering::SeqCst) {
                break;
            }
            if buffer.len() < config.min_batch {
                continue;
            }
            let batch = match buffer.sample(config.batch_size) {
                Ok(batch) if !batch.is_empty() => batch,
                Ok(_) => continue,
                Err(e) => {
                    log::warn!("trainer could not sample: {}", e);
                    continue;
                }
            };
            let mut net = (*policy.current()).clone();
            let mut loss = 0.0;
            for exp in &batch {
                let step = net.train_with_reward(
                    &exp.features,
                    exp.chunk,
                    exp.spawn_type,
                    exp.reward(),
                    config.learning_rate,
                );
                loss += step.total();
            }
            if !net.is_finite() {
                log::error!("training step diverged into non-finite weights, discarding");
                continue;
            }
            net.bump_version();
            let version = net.version();
            policy.publish(net);
            steps += 1;
            samples += batch.len();
            let rate = samples as f32 / started.elapsed().as_secs_f32().max(1e-3);
            dashboard.record_training_step(loss / batch.len() as f32, version, rate);
            if steps % config.checkpoint_interval == 0 {
                if let Err(e) = policy.current().save(&config.weights_path) {
                    log::error!("checkpoint save failed: {}", e);
                }
            }
        }
    }
}

impl Drop for ContinuousTrainer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::SpawnType;
    use crate::policy::PolicyNetwork;
    use crate::replay::Experience;
    use crate::FEATURES;

    fn harness(interval_ms: u64) -> (ContinuousTrainer, Arc<PolicyHandle>, Arc<ReplayBuffer>) {
        let config = TrainerConfig {
            interval_ms,
            min_batch: 4,
            batch_size: 4,
            checkpoint_interval: 1_000_000,
            ..TrainerConfig::default()
        };
        let policy = Arc::new(PolicyHandle::new(PolicyNetwork::seeded(257, 11)));
        let buffer = Arc::new(ReplayBuffer::new(64, Duration::from_millis(100), 3));
        let dashboard = Arc::new(Dashboard::default());
        let trainer = ContinuousTrainer::new(config, policy.clone(), buffer.clone(), dashboard);
        (trainer, policy, buffer)
    }

    fn resolved(reward: f32) -> Experience {
        Experience {
            features: vec![0.4; FEATURES],
            chunk: 51,
            spawn_type: Some(SpawnType::Energy),
            expected: 0.5,
            actual: Some(reward),
            territory: "t".into(),
            timestamp: 0.0,
            model_version: 0,
        }
    }

    #[test]
    fn trains_once_the_buffer_fills() {
        let (trainer, policy, buffer) = harness(10);
        for _ in 0..8 {
            buffer.add(resolved(0.5)).unwrap();
        }
        trainer.start();
        let deadline = Instant::now() + Duration::from_secs(5);
        while policy.version() == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        trainer.stop();
        assert!(policy.version() > 0);
        assert!(policy.current().is_finite());
    }

    #[test]
    fn version_is_monotone_across_stop_start() {
        let (trainer, policy, buffer) = harness(10);
        for _ in 0..8 {
            buffer.add(resolved(0.3)).unwrap();
        }
        trainer.start();
        trainer.start(); // idempotent
        let deadline = Instant::now() + Duration::from_secs(5);
        while policy.version() < 2 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        trainer.stop();
        trainer.stop(); // idempotent
        let after_first = policy.version();
        assert!(after_first >= 2);
        trainer.start();
        let deadline = Instant::now() + Duration::from_secs(5);
        while policy.version() <= after_first && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        trainer.stop();
        assert!(policy.version() > after_first);
    }

    #[test]
    fn nan_rewards_never_commit_a_step() {
        let (trainer, policy, buffer) = harness(10);
        for _ in 0..8 {
            buffer.add(resolved(f32::NAN)).unwrap();
        }
        trainer.start();
        std::thread::sleep(Duration::from_millis(200));
        trainer.stop();
        assert!(policy.version() == 0);
        assert!(policy.current().is_finite());
    }

    #[test]
    fn empty_buffer_commits_nothing() {
        let (trainer, policy, _buffer) = harness(5);
        trainer.start();
        std::thread::sleep(Duration::from_millis(100));
        trainer.stop();
        assert!(policy.version() == 0);
    }
}
