use crate::Chunk;
use crate::Energy;
use serde::Deserialize;
use serde::Serialize;

/// Parasite variants: energy parasites harass miners, combat parasites
/// draw protectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpawnType {
    Energy,
    Combat,
}

/// An entity as the client reports it: an opaque id, the chunk it
/// occupies, and an optional state/type tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityView {
    pub id: String,
    pub chunk_id: Chunk,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<SpawnType>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QueenEnergy {
    pub current: Energy,
}

/// A start/end window of a player resource over the observation tick.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResourceWindow {
    pub start: f32,
    pub end: f32,
}

impl ResourceWindow {
    pub fn delta(&self) -> f32 {
        self.end - self.start
    }
}

/// One tick's snapshot of a territory as sent by the client or the
/// simulator. `miningWorkers` is the proper subset of `workersPresent`
/// that is actually extracting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub timestamp: f64,
    pub territory_id: String,
    #[serde(default)]
    pub tick: u64,
    #[serde(default)]
    pub mining_workers: Vec<EntityView>,
    #[serde(default)]
    pub workers_present: Vec<EntityView>,
    #[serde(default)]
    pub protectors: Vec<EntityView>,
    #[serde(default)]
    pub parasites_start: Vec<EntityView>,
    #[serde(default)]
    pub parasites_end: Vec<EntityView>,
    pub queen_energy: QueenEnergy,
    pub player_energy: ResourceWindow,
    pub player_minerals: ResourceWindow,
    pub hive_chunk: Chunk,
}

impl Observation {
    /// workers the gate should reason about: everything visible, or the
    /// mining list when the client only reports miners
    pub fn worker_chunks(&self) -> Vec<Chunk> {
        let source = if self.workers_present.is_empty() {
            &self.mining_workers
        } else {
            &self.workers_present
        };
        source.iter().map(|w| w.chunk_id).collect()
    }

    pub fn protector_chunks(&self) -> Vec<Chunk> {
        self.protectors.iter().map(|p| p.chunk_id).collect()
    }

    pub fn total_workers(&self) -> usize {
        self.workers_present.len() + self.mining_workers.len()
    }
}

impl crate::Arbitrary for Observation {
    fn random() -> Self {
        use rand::Rng;
        let mut rng = rand::rng();
        let entity = |i: usize, prefix: &str, rng: &mut rand::rngs::ThreadRng| EntityView {
            id: format!("{}_{}", prefix, i),
            chunk_id: rng.random_range(0..256),
            state: None,
            r#type: None,
        };
        let workers = (0..rng.random_range(0..8))
            .map(|i| entity(i, "worker", &mut rng))
            .collect::<Vec<_>>();
        let protectors = (0..rng.random_range(0..4))
            .map(|i| entity(i, "protector", &mut rng))
            .collect::<Vec<_>>();
        Self {
            timestamp: rng.random_range(0.0..1e9),
            territory_id: "territory-random".to_string(),
            tick: rng.random_range(0..10_000),
            mining_workers: workers.clone(),
            workers_present: workers,
            protectors,
            parasites_start: vec![],
            parasites_end: vec![],
            queen_energy: QueenEnergy {
                current: rng.random_range(0.0..100.0),
            },
            player_energy: ResourceWindow {
                start: 100.0,
                end: rng.random_range(50.0..150.0),
            },
            player_minerals: ResourceWindow {
                start: 50.0,
                end: rng.random_range(0.0..100.0),
            },
            hive_chunk: rng.random_range(0..256),
        }
    }
}
