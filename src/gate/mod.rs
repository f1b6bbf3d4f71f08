pub mod capacity;
pub mod config;
pub mod cost;
pub mod disruption;
pub mod exploration;
pub mod gate;
pub mod location;
pub mod preprocess;
pub mod survival;

pub use config::GateConfig;
pub use cost::Components;
pub use cost::CostFunction;
pub use exploration::ExplorationTracker;
pub use gate::Decision;
pub use gate::DecisionGate;
pub use gate::GateDecision;
pub use preprocess::PreprocessGate;

use crate::observation::Observation;
use crate::Chunk;
use crate::Energy;

/// The slice of an observation the cost function reasons about.
#[derive(Debug, Clone)]
pub struct GateView {
    pub workers: Vec<Chunk>,
    pub protectors: Vec<Chunk>,
    pub hive: Chunk,
    pub queen_energy: Energy,
}

impl From<&Observation> for GateView {
    fn from(obs: &Observation) -> Self {
        Self {
            workers: obs.worker_chunks(),
            protectors: obs.protector_chunks(),
            hive: obs.hive_chunk,
            queen_energy: obs.queen_energy.current,
        }
    }
}
