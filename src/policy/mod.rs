pub mod decision;
pub mod layer;
pub mod network;
pub mod snapshot;

pub use decision::NnDecision;
pub use decision::SpawnDecision;
pub use layer::Dense;
pub use network::PolicyNetwork;
pub use network::TrainLoss;
pub use snapshot::PolicyHandle;
