use super::config::SimConfig;
use super::entities::Parasite;
use super::entities::Protector;
use super::entities::Worker;
use crate::observation::EntityView;
use crate::observation::Observation;
use crate::observation::QueenEnergy;
use crate::observation::ResourceWindow;
use crate::Chunk;
use crate::Energy;
use crate::Tick;

pub const SIM_TERRITORY: &str = "sim-territory";

/// Complete game state of the simulated territory at one point in time.
#[derive(Debug, Clone)]
pub struct SimState {
    pub workers: Vec<Worker>,
    pub protectors: Vec<Protector>,
    pub parasites: Vec<Parasite>,

    pub queen_energy: Energy,
    pub queen_chunk: Chunk,

    pub player_energy: f32,
    pub player_minerals: f32,
    pub player_energy_prev: f32,
    pub player_minerals_prev: f32,

    pub mining_spots: Vec<Chunk>,
    pub tick: Tick,
}

impl SimState {
    pub fn create_initial(config: &SimConfig) -> Self {
        let workers = (0..config.num_workers)
            .map(|i| spawn_worker(config, i))
            .collect();
        let protectors = (0..config.num_protectors)
            .map(|i| spawn_protector(config, i))
            .collect();
        Self {
            workers,
            protectors,
            parasites: vec![],
            queen_energy: config.queen_start_energy,
            queen_chunk: config.queen_chunk,
            player_energy: config.player_start_energy,
            player_minerals: config.player_start_minerals,
            player_energy_prev: config.player_start_energy,
            player_minerals_prev: config.player_start_minerals,
            mining_spots: config.mining_spots.clone(),
            tick: 0,
        }
    }

    /// grow or shrink the entity populations, e.g. on a curriculum
    /// phase transition
    pub fn reshape(&mut self, config: &SimConfig, num_workers: usize, num_protectors: usize) {
        while self.workers.len() > num_workers {
            self.workers.pop();
        }
        while self.workers.len() < num_workers {
            let i = self.workers.len();
            self.workers.push(spawn_worker(config, i));
        }
        while self.protectors.len() > num_protectors {
            self.protectors.pop();
        }
        while self.protectors.len() < num_protectors {
            let i = self.protectors.len();
            self.protectors.push(spawn_protector(config, i));
        }
    }

    /// the wire-format observation for the current tick
    pub fn observation(&self, parasites_start: Vec<EntityView>) -> Observation {
        Observation {
            timestamp: self.tick as f64,
            territory_id: SIM_TERRITORY.to_string(),
            tick: self.tick,
            mining_workers: self.worker_views(true),
            workers_present: self.worker_views(false),
            protectors: self
                .protectors
                .iter()
                .enumerate()
                .map(|(i, p)| EntityView {
                    id: format!("protector_{}", i),
                    chunk_id: p.chunk,
                    state: Some(p.state.label().to_string()),
                    r#type: None,
                })
                .collect(),
            parasites_start,
            parasites_end: self.parasite_views(),
            queen_energy: QueenEnergy {
                current: self.queen_energy,
            },
            player_energy: ResourceWindow {
                start: self.player_energy_prev,
                end: self.player_energy,
            },
            player_minerals: ResourceWindow {
                start: self.player_minerals_prev,
                end: self.player_minerals,
            },
            hive_chunk: self.queen_chunk,
        }
    }

    fn worker_views(&self, mining_only: bool) -> Vec<EntityView> {
        self.workers
            .iter()
            .enumerate()
            .filter(|(_, w)| !mining_only || w.is_mining())
            .map(|(i, w)| EntityView {
                id: format!("worker_{}", i),
                chunk_id: w.chunk,
                state: Some(w.state.label().to_string()),
                r#type: None,
            })
            .collect()
    }

    pub fn parasite_views(&self) -> Vec<EntityView> {
        self.parasites
            .iter()
            .enumerate()
            .map(|(i, p)| EntityView {
                id: format!("parasite_{}", i),
                chunk_id: p.chunk,
                state: None,
                r#type: Some(p.kind),
            })
            .collect()
    }
}

fn spawn_worker(config: &SimConfig, index: usize) -> Worker {
    let spot = config.mining_spots[index % config.mining_spots.len()];
    Worker::new(config.base_chunk, spot)
}

fn spawn_protector(config: &SimConfig, index: usize) -> Protector {
    Protector::new(config.queen_chunk, patrol_path(config, index))
}

/// Patrol routes spread protectors around the hive: a ring for the
/// first, a square for the second, offset rings for the rest.
fn patrol_path(config: &SimConfig, index: usize) -> Vec<Chunk> {
    let grid_size = config.grid_size as i32;
    let cx = config.queen_chunk % grid_size;
    let cy = config.queen_chunk / grid_size;
    let radius = (grid_size / 3).min(6);
    let path = match index {
        0 => ring(cx, cy, radius, grid_size, 8, 0.0),
        1 => square(cx, cy, radius, grid_size),
        i => ring(cx, cy, radius, grid_size, 6, i as f32 * std::f32::consts::FRAC_PI_4),
    };
    if path.is_empty() {
        vec![config.queen_chunk]
    } else {
        path
    }
}

fn ring(cx: i32, cy: i32, radius: i32, grid_size: i32, points: usize, offset: f32) -> Vec<Chunk> {
    let mut path = Vec::new();
    for i in 0..points {
        let angle = offset + (2.0 * std::f32::consts::PI * i as f32) / points as f32;
        let x = (cx + (radius as f32 * angle.cos()).round() as i32).clamp(0, grid_size - 1);
        let y = (cy + (radius as f32 * angle.sin()).round() as i32).clamp(0, grid_size - 1);
        let chunk = y * grid_size + x;
        if !path.contains(&chunk) {
            path.push(chunk);
        }
    }
    path
}

fn square(cx: i32, cy: i32, radius: i32, grid_size: i32) -> Vec<Chunk> {
    let mut path = Vec::new();
    for (dx, dy) in [(-1, -1), (1, -1), (1, 1), (-1, 1)] {
        let x = (cx + dx * radius).clamp(0, grid_size - 1);
        let y = (cy + dy * radius).clamp(0, grid_size - 1);
        let chunk = y * grid_size + x;
        if !path.contains(&chunk) {
            path.push(chunk);
        }
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_matches_config() {
        let config = SimConfig::default();
        let state = SimState::create_initial(&config);
        assert!(state.workers.len() == config.num_workers);
        assert!(state.protectors.len() == config.num_protectors);
        assert!(state.parasites.is_empty());
        assert!(state.queen_energy == config.queen_start_energy);
        assert!(state.tick == 0);
    }

    #[test]
    fn patrol_paths_stay_inside_the_grid() {
        let config = SimConfig {
            num_protectors: 5,
            ..SimConfig::default()
        };
        let state = SimState::create_initial(&config);
        let chunks = (config.grid_size * config.grid_size) as Chunk;
        for protector in &state.protectors {
            assert!(!protector.patrol_path.is_empty());
            assert!(protector.patrol_path.iter().all(|&c| c >= 0 && c < chunks));
        }
    }

    #[test]
    fn reshape_adjusts_populations() {
        let config = SimConfig::default();
        let mut state = SimState::create_initial(&config);
        state.reshape(&config, 7, 0);
        assert!(state.workers.len() == 7);
        assert!(state.protectors.is_empty());
        state.reshape(&config, 2, 3);
        assert!(state.workers.len() == 2);
        assert!(state.protectors.len() == 3);
    }

    #[test]
    fn observation_reports_only_miners_as_mining() {
        let config = SimConfig::default();
        let mut state = SimState::create_initial(&config);
        state.workers[0].state = super::super::entities::WorkerState::Mining;
        let obs = state.observation(vec![]);
        assert!(obs.mining_workers.len() == 1);
        assert!(obs.workers_present.len() == config.num_workers);
        assert!(obs.territory_id == SIM_TERRITORY);
    }
}
