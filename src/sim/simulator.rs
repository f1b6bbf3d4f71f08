use super::config::SimConfig;
use super::entities::Parasite;
use super::entities::ProtectorState;
use super::entities::WorkerState;
use super::state::SimState;
use crate::grid::Grid;
use crate::observation::Observation;
use crate::observation::SpawnType;
use crate::Chunk;

/// Deterministic tick-based training environment. Each `tick()`
/// advances every entity one step, resolves interactions, accrues
/// mining income, regenerates queen energy and returns the resulting
/// observation. No randomness anywhere: the same spawn sequence always
/// replays the same episode.
pub struct Simulator {
    config: SimConfig,
    grid: Grid,
    pub state: SimState,
}

impl Simulator {
    pub fn new(config: SimConfig) -> Self {
        let grid = Grid::new(config.grid_size);
        let state = SimState::create_initial(&config);
        Self { config, grid, state }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn reshape(&mut self, num_workers: usize, num_protectors: usize) {
        let config = self.config.clone();
        self.state.reshape(&config, num_workers, num_protectors);
    }

    /// Attempt to place a parasite. Validates bounds and energy;
    /// failed attempts never touch the queen's energy.
    pub fn spawn_parasite(&mut self, chunk: Chunk, kind: SpawnType) -> bool {
        if !self.grid.contains(chunk) {
            return false;
        }
        let cost = self.config.parasite_cost(kind);
        if self.state.queen_energy < cost {
            return false;
        }
        self.state.queen_energy -= cost;
        self.state.parasites.push(Parasite {
            kind,
            chunk,
            spawn_tick: self.state.tick,
        });
        true
    }

    pub fn tick(&mut self) -> Observation {
        self.state.tick += 1;
        self.state.player_energy_prev = self.state.player_energy;
        self.state.player_minerals_prev = self.state.player_minerals;
        let parasites_start = self.state.parasite_views();

        self.step_workers();
        self.step_protectors();
        self.resolve_interactions();
        self.drain_player_energy();
        self.regenerate_queen();

        self.state.observation(parasites_start)
    }

    fn step_workers(&mut self) {
        let mut deposits = 0.0;
        for worker in &mut self.state.workers {
            match worker.state {
                WorkerState::Idle => {
                    worker.state = WorkerState::TravelingToSpot;
                }
                WorkerState::TravelingToSpot => {
                    worker.chunk = step_toward(&self.grid, worker.chunk, worker.target_chunk);
                    if worker.chunk == worker.target_chunk {
                        worker.state = WorkerState::Mining;
                        worker.mining_timer = self.config.mining_duration;
                    }
                }
                WorkerState::Mining => {
                    worker.carried_resources += self.config.mining_rate;
                    worker.mining_timer = worker.mining_timer.saturating_sub(1);
                    if worker.mining_timer == 0 {
                        worker.state = WorkerState::ReturningToBase;
                    }
                }
                WorkerState::ReturningToBase => {
                    worker.chunk = step_toward(&self.grid, worker.chunk, worker.base_chunk);
                    if worker.chunk == worker.base_chunk {
                        deposits += worker.carried_resources;
                        worker.carried_resources = 0.0;
                        worker.state = WorkerState::Idle;
                    }
                }
                WorkerState::Fleeing => {
                    let threat = nearest_chunk(&self.grid, worker.chunk, &self.state.parasites);
                    if let Some(threat) = threat {
                        worker.chunk = step_away(&self.grid, worker.chunk, threat);
                    }
                    worker.flee_timer = worker.flee_timer.saturating_sub(1);
                    if worker.flee_timer == 0 {
                        worker.state = WorkerState::Idle;
                    }
                }
            }
        }
        self.state.player_minerals += deposits;
    }

    fn step_protectors(&mut self) {
        for protector in &mut self.state.protectors {
            match protector.state {
                ProtectorState::Patrolling => {
                    let waypoint = protector.waypoint();
                    protector.chunk = step_toward(&self.grid, protector.chunk, waypoint);
                    if protector.chunk == waypoint {
                        protector.advance_waypoint();
                    }
                }
                ProtectorState::Chasing => {
                    if let Some(target) = protector.chase_target {
                        protector.chunk = step_toward(&self.grid, protector.chunk, target);
                    }
                }
                ProtectorState::Returning => {
                    let waypoint = protector.waypoint();
                    protector.chunk = step_toward(&self.grid, protector.chunk, waypoint);
                    if protector.chunk == waypoint {
                        protector.advance_waypoint();
                        protector.state = ProtectorState::Patrolling;
                    }
                }
            }
        }
    }

    fn resolve_interactions(&mut self) {
        // workers near any parasite scatter
        for worker in &mut self.state.workers {
            if worker.state == WorkerState::Fleeing {
                continue;
            }
            let close = self
                .state
                .parasites
                .iter()
                .any(|p| self.grid.distance(worker.chunk, p.chunk) <= self.config.flee_radius);
            if close {
                worker.state = WorkerState::Fleeing;
                worker.flee_timer = self.config.flee_duration;
            }
        }

        // protectors lock onto the nearest parasite inside aggro range
        for protector in &mut self.state.protectors {
            let target = nearest_chunk(&self.grid, protector.chunk, &self.state.parasites)
                .filter(|&c| self.grid.distance(protector.chunk, c) <= self.config.aggro_radius);
            match (protector.state, target) {
                (_, Some(target)) => {
                    protector.state = ProtectorState::Chasing;
                    protector.chase_target = Some(target);
                }
                (ProtectorState::Chasing, None) => {
                    protector.state = ProtectorState::Returning;
                    protector.chase_target = None;
                }
                _ => {}
            }
        }

        // a protector standing on a parasite destroys it
        let protector_chunks: Vec<Chunk> = self.state.protectors.iter().map(|p| p.chunk).collect();
        let tick = self.state.tick;
        let lifetime = self.config.parasite_lifetime;
        let destroyed = self
            .state
            .parasites
            .iter()
            .filter(|p| protector_chunks.contains(&p.chunk))
            .count();
        if destroyed > 0 {
            log::debug!("{} parasite(s) destroyed at tick {}", destroyed, tick);
        }
        self.state
            .parasites
            .retain(|p| !protector_chunks.contains(&p.chunk) && tick - p.spawn_tick < lifetime);

        // chasers whose quarry just died head home
        for protector in &mut self.state.protectors {
            if protector.state == ProtectorState::Chasing {
                let gone = protector
                    .chase_target
                    .map(|c| !self.state.parasites.iter().any(|p| p.chunk == c))
                    .unwrap_or(true);
                if gone {
                    protector.state = ProtectorState::Returning;
                    protector.chase_target = None;
                }
            }
        }
    }

    fn drain_player_energy(&mut self) {
        self.state.player_energy += self.config.player_energy_regen;
        let drain = self
            .state
            .parasites
            .iter()
            .filter(|p| p.kind == SpawnType::Energy)
            .count() as f32
            * self.config.parasite_energy_drain;
        self.state.player_energy = (self.state.player_energy - drain).max(0.0);
    }

    fn regenerate_queen(&mut self) {
        self.state.queen_energy =
            (self.state.queen_energy + self.config.queen_energy_regen).min(self.config.queen_max_energy);
    }
}

/// one-chunk step toward the target, diagonals allowed
fn step_toward(grid: &Grid, from: Chunk, to: Chunk) -> Chunk {
    if from == to || !grid.contains(from) || !grid.contains(to) {
        return from;
    }
    let (fx, fy) = grid.coords(from);
    let (tx, ty) = grid.coords(to);
    let dx = (tx - fx).signum() as i32;
    let dy = (ty - fy).signum() as i32;
    grid.chunk_at(fx as i32 + dx, fy as i32 + dy)
}

/// one-chunk step directly away from the threat, clamped at the walls
fn step_away(grid: &Grid, from: Chunk, threat: Chunk) -> Chunk {
    let (fx, fy) = grid.coords(from);
    let (tx, ty) = grid.coords(threat);
    let dx = -((tx - fx).signum() as i32);
    let dy = -((ty - fy).signum() as i32);
    if dx == 0 && dy == 0 {
        // on top of the threat: any direction beats staying
        grid.chunk_at(fx as i32 + 1, fy as i32)
    } else {
        grid.chunk_at(fx as i32 + dx, fy as i32 + dy)
    }
}

fn nearest_chunk(grid: &Grid, from: Chunk, parasites: &[Parasite]) -> Option<Chunk> {
    parasites
        .iter()
        .map(|p| (p.chunk, grid.distance(from, p.chunk)))
        .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(chunk, _)| chunk)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simulator() -> Simulator {
        Simulator::new(SimConfig::default())
    }

    #[test]
    fn spawn_deducts_energy_exactly() {
        let mut sim = simulator();
        sim.state.queen_energy = 15.0;
        assert!(sim.spawn_parasite(100, SpawnType::Energy));
        assert!(sim.state.queen_energy == 0.0);
        assert!(sim.state.parasites.len() == 1);
    }

    #[test]
    fn failed_spawn_never_mutates_energy() {
        let mut sim = simulator();
        sim.state.queen_energy = 10.0;
        assert!(!sim.spawn_parasite(100, SpawnType::Energy));
        assert!(sim.state.queen_energy == 10.0);
        assert!(!sim.spawn_parasite(-1, SpawnType::Energy));
        assert!(!sim.spawn_parasite(256, SpawnType::Energy));
        assert!(sim.state.parasites.is_empty());
    }

    #[test]
    fn workers_reach_their_spots_and_mine() {
        let mut sim = simulator();
        for _ in 0..40 {
            sim.tick();
        }
        assert!(sim.state.workers.iter().any(|w| w.is_mining()
            || w.state == WorkerState::ReturningToBase
            || w.carried_resources > 0.0));
    }

    #[test]
    fn mining_eventually_raises_player_minerals() {
        let mut sim = simulator();
        let before = sim.state.player_minerals;
        for _ in 0..120 {
            sim.tick();
        }
        assert!(sim.state.player_minerals > before);
    }

    #[test]
    fn workers_flee_nearby_parasites() {
        let mut sim = simulator();
        sim.state.protectors.clear();
        // park a worker mid-grid and drop a parasite on top of it
        sim.state.workers[0].chunk = 100;
        sim.state.workers[0].state = WorkerState::Mining;
        sim.state.workers[0].mining_timer = 100;
        sim.state.queen_energy = 50.0;
        assert!(sim.spawn_parasite(101, SpawnType::Energy));
        sim.tick();
        assert!(sim.state.workers[0].state == WorkerState::Fleeing);
        let timer = sim.state.workers[0].flee_timer;
        sim.tick();
        assert!(sim.state.workers[0].flee_timer < timer);
    }

    #[test]
    fn protectors_chase_and_destroy() {
        let mut sim = simulator();
        sim.state.workers.clear();
        sim.state.protectors.truncate(1);
        sim.state.protectors[0].chunk = 100;
        sim.state.queen_energy = 50.0;
        assert!(sim.spawn_parasite(102, SpawnType::Combat));
        sim.tick();
        assert!(sim.state.protectors[0].state == ProtectorState::Chasing);
        for _ in 0..6 {
            sim.tick();
        }
        assert!(sim.state.parasites.is_empty());
        assert!(sim.state.protectors[0].state != ProtectorState::Chasing);
    }

    #[test]
    fn parasites_expire_by_lifetime() {
        let mut sim = simulator();
        sim.state.protectors.clear();
        sim.state.queen_energy = 50.0;
        assert!(sim.spawn_parasite(0, SpawnType::Energy));
        for _ in 0..(sim.config.parasite_lifetime + 2) {
            sim.tick();
        }
        assert!(sim.state.parasites.is_empty());
    }

    #[test]
    fn queen_energy_regenerates_to_cap() {
        let mut sim = simulator();
        sim.state.queen_energy = 99.5;
        sim.tick();
        assert!(sim.state.queen_energy == sim.config.queen_max_energy);
        sim.tick();
        assert!(sim.state.queen_energy == sim.config.queen_max_energy);
    }

    #[test]
    fn ticks_are_deterministic() {
        let run = || {
            let mut sim = Simulator::new(SimConfig::default());
            let mut minerals = vec![];
            for i in 0..50 {
                if i == 10 {
                    sim.spawn_parasite(45, SpawnType::Energy);
                }
                let obs = sim.tick();
                minerals.push(obs.player_minerals.end.to_bits());
            }
            minerals
        };
        assert!(run() == run());
    }

    #[test]
    fn observation_reflects_resource_windows() {
        let mut sim = simulator();
        let obs = sim.tick();
        assert!(obs.player_energy.start == 100.0);
        assert!(obs.tick == 1);
        assert!(obs.hive_chunk == sim.config.queen_chunk);
    }
}
