use crate::observation::SpawnType;
use crate::Chunk;
use crate::Reward;
use serde::Deserialize;
use serde::Serialize;

/// One recorded decision. `chunk` is -1 for the no-spawn action; the
/// sentinel tensor slot never leaves the policy head. `actual` stays
/// None (pending) until a later observation settles the outcome, and
/// a pending row is invisible to the trainer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experience {
    pub features: Vec<f32>,
    pub chunk: Chunk,
    pub spawn_type: Option<SpawnType>,
    pub expected: Reward,
    pub actual: Option<Reward>,
    pub territory: String,
    pub timestamp: f64,
    pub model_version: u64,
}

impl Experience {
    pub fn is_pending(&self) -> bool {
        self.actual.is_none()
    }

    /// the signal the trainer learns from once the row is resolved
    pub fn reward(&self) -> Reward {
        self.actual.unwrap_or(self.expected)
    }
}
