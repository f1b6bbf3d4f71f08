use crate::observation::Observation;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

/// Early-exit filter ahead of feature extraction: a territory with no
/// workers and no protectors has nothing to disrupt, so the whole NN
/// pipeline is bypassed.
#[derive(Debug, Default)]
pub struct PreprocessGate {
    total: AtomicU64,
    skipped: AtomicU64,
    passed: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreprocessDecision {
    pub skip: bool,
    pub reason: &'static str,
    pub workers: usize,
    pub protectors: usize,
}

impl PreprocessGate {
    pub fn evaluate(&self, obs: &Observation) -> PreprocessDecision {
        self.total.fetch_add(1, Ordering::Relaxed);
        let workers = obs.total_workers();
        let protectors = obs.protectors.len();
        if workers == 0 && protectors == 0 {
            self.skipped.fetch_add(1, Ordering::Relaxed);
            log::debug!("preprocess skip: no activity");
            PreprocessDecision {
                skip: true,
                reason: "no_activity",
                workers,
                protectors,
            }
        } else {
            self.passed.fetch_add(1, Ordering::Relaxed);
            PreprocessDecision {
                skip: false,
                reason: "activity_detected",
                workers,
                protectors,
            }
        }
    }

    pub fn statistics(&self) -> serde_json::Value {
        let total = self.total.load(Ordering::Relaxed);
        let skipped = self.skipped.load(Ordering::Relaxed);
        serde_json::json!({
            "total_checks": total,
            "skipped_no_activity": skipped,
            "passed_through": self.passed.load(Ordering::Relaxed),
            "skip_rate": skipped as f64 / total.max(1) as f64,
        })
    }
}
