use crate::observation::SpawnType;
use crate::Chunk;
use crate::Probability;
use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NnDecision {
    Spawn,
    NoSpawn,
}

/// What the network proposes for one observation. `chunk` is -1 and
/// `spawn_type` is None when the argmax landed on the no-spawn slot;
/// `confidence` is the chosen slot's probability either way.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnDecision {
    pub chunk: Chunk,
    pub spawn_type: Option<SpawnType>,
    pub confidence: Probability,
    pub nn_decision: NnDecision,
}

impl SpawnDecision {
    pub fn is_spawn(&self) -> bool {
        self.nn_decision == NnDecision::Spawn
    }
}
