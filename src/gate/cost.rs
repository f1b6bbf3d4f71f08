use super::capacity;
use super::config::GateConfig;
use super::disruption;
use super::exploration::ExplorationTracker;
use super::location;
use super::survival;
use super::GateView;
use crate::grid::Grid;
use crate::observation::SpawnType;
use crate::Chunk;
use crate::Reward;
use serde::Serialize;

/// The five component values behind one expected-reward score.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Components {
    pub survival: f32,
    pub disruption: f32,
    pub location: f32,
    pub exploration: f32,
    pub capacity_valid: bool,
}

impl Components {
    pub fn expected(&self, config: &GateConfig) -> Reward {
        if !self.capacity_valid {
            return f32::NEG_INFINITY;
        }
        config.weight_survival * self.survival
            + config.weight_disruption * self.disruption
            + config.weight_location * self.location
            + config.weight_exploration * self.exploration
    }

    /// neutral component set for decisions made without a candidate
    pub fn idle() -> Self {
        Self {
            survival: 1.0,
            disruption: 0.0,
            location: 0.0,
            exploration: 0.0,
            capacity_valid: true,
        }
    }
}

/// Evaluates the cost function, scalar for a single candidate and dense
/// over all G² chunks for the should-spawn search. The dense path works
/// entirely in pre-allocated arrays: one distance row per entity, array
/// combines, a single argmax.
pub struct CostFunction {
    grid: Grid,
    row: Vec<f32>,
    survival: Vec<f32>,
    disruption: Vec<f32>,
    nearest: Vec<f32>,
    location: Vec<f32>,
    score: Vec<f32>,
}

impl CostFunction {
    pub fn new(grid: Grid) -> Self {
        let n = grid.chunks();
        Self {
            grid,
            row: vec![0.0; n],
            survival: vec![0.0; n],
            disruption: vec![0.0; n],
            nearest: vec![0.0; n],
            location: vec![0.0; n],
            score: vec![0.0; n],
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Component values for a single candidate spawn.
    pub fn evaluate(
        &self,
        config: &GateConfig,
        view: &GateView,
        spawn: Chunk,
        spawn_type: SpawnType,
        tracker: &ExplorationTracker,
    ) -> Components {
        let capacity_valid = capacity::has_capacity(config, spawn_type, view.queen_energy);
        let survival = survival::survival(&self.grid, config, spawn, &view.protectors);
        Components {
            survival,
            disruption: disruption::disruption(&self.grid, config, spawn, &view.workers, survival),
            location: location::penalty(&self.grid, spawn, view.hive, &view.workers),
            exploration: tracker.bonus(config, spawn),
            capacity_valid,
        }
    }

    /// Argmax of the expected reward over every chunk on the grid.
    /// Returns None when the queen cannot pay for the given spawn type,
    /// since no location can redeem an unaffordable spawn.
    pub fn best_alternative(
        &mut self,
        config: &GateConfig,
        view: &GateView,
        spawn_type: SpawnType,
        tracker: &ExplorationTracker,
    ) -> Option<(Chunk, Components, Reward)> {
        if !capacity::has_capacity(config, spawn_type, view.queen_energy) {
            return None;
        }
        survival::survival_into(&self.grid, config, &view.protectors, &mut self.row, &mut self.survival);
        disruption::disruption_into(
            &self.grid,
            config,
            &view.workers,
            &self.survival,
            &mut self.row,
            &mut self.disruption,
        );
        location::penalty_into(
            &self.grid,
            view.hive,
            &view.workers,
            &mut self.row,
            &mut self.nearest,
            &mut self.location,
        );
        tracker.bonus_into(config, &mut self.score);
        for i in 0..self.score.len() {
            self.score[i] = config.weight_survival * self.survival[i]
                + config.weight_disruption * self.disruption[i]
                + config.weight_location * self.location[i]
                + config.weight_exploration * self.score[i];
        }
        let best = self
            .score
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i)?;
        let chunk = best as Chunk;
        let components = Components {
            survival: self.survival[best],
            disruption: self.disruption[best],
            location: self.location[best],
            exploration: tracker.bonus(config, chunk),
            capacity_valid: true,
        };
        Some((chunk, components, self.score[best]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(workers: Vec<Chunk>, protectors: Vec<Chunk>, energy: f32) -> GateView {
        GateView {
            workers,
            protectors,
            hive: 0,
            queen_energy: energy,
        }
    }

    fn cost() -> (CostFunction, GateConfig, ExplorationTracker) {
        (
            CostFunction::new(Grid::new(16)),
            GateConfig::default(),
            ExplorationTracker::new(256),
        )
    }

    #[test]
    fn expected_reward_is_finite_iff_affordable() {
        let (cost, config, tracker) = cost();
        let affordable = cost.evaluate(&config, &view(vec![50], vec![], 100.0), 51, SpawnType::Energy, &tracker);
        assert!(affordable.capacity_valid);
        assert!(affordable.expected(&config).is_finite());
        let broke = cost.evaluate(&config, &view(vec![], vec![], 5.0), 50, SpawnType::Energy, &tracker);
        assert!(!broke.capacity_valid);
        assert!(broke.expected(&config) == f32::NEG_INFINITY);
    }

    #[test]
    fn good_spawn_scores_positive() {
        let (cost, config, tracker) = cost();
        let components = cost.evaluate(&config, &view(vec![50], vec![], 100.0), 51, SpawnType::Energy, &tracker);
        assert!(components.survival == 1.0);
        assert!(components.disruption > 0.5);
        assert!(components.expected(&config) > 0.0);
    }

    #[test]
    fn search_lands_near_the_workers() {
        let (mut cost, config, tracker) = cost();
        let view = view(vec![100, 101], vec![], 50.0);
        let (chunk, components, score) = cost
            .best_alternative(&config, &view, SpawnType::Energy, &tracker)
            .unwrap();
        let grid = Grid::new(16);
        let to_workers = grid.distance(chunk, 100).min(grid.distance(chunk, 101));
        assert!(to_workers <= 1.5);
        assert!(components.disruption > 0.5);
        assert!(score > config.should_spawn_threshold);
    }

    #[test]
    fn search_refuses_unaffordable_types() {
        let (mut cost, config, tracker) = cost();
        let view = view(vec![100], vec![], 10.0);
        assert!(cost
            .best_alternative(&config, &view, SpawnType::Energy, &tracker)
            .is_none());
    }

    #[test]
    fn search_agrees_with_scalar_evaluation() {
        let (mut cost, config, tracker) = cost();
        let view = view(vec![60, 61, 180], vec![62, 200], 80.0);
        let (chunk, _, score) = cost
            .best_alternative(&config, &view, SpawnType::Energy, &tracker)
            .unwrap();
        let scalar = cost.evaluate(&config, &view, chunk, SpawnType::Energy, &tracker);
        assert!((scalar.expected(&config) - score).abs() < 1e-5);
        // no other chunk scores better than the reported argmax
        for other in 0..256 {
            let components = cost.evaluate(&config, &view, other, SpawnType::Energy, &tracker);
            assert!(components.expected(&config) <= score + 1e-5);
        }
    }
}
