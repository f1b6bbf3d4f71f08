use super::config::GateConfig;
use crate::grid::Grid;
use crate::Chunk;
use crate::Probability;

/// Threat a single protector at distance `d` poses to a fresh parasite:
/// certain death inside the kill range, exponential falloff through the
/// threat zone, nothing beyond the safe range.
pub fn threat(config: &GateConfig, d: f32) -> Probability {
    if d < config.kill_range {
        1.0
    } else if d < config.safe_range {
        (-config.threat_decay * (d - config.kill_range)).exp()
    } else {
        0.0
    }
}

/// Survival probability of a parasite spawned at `spawn` against a set
/// of protectors: the product of (1 − threat) over all of them. Empty
/// protector sets survive with certainty; invalid spawn chunks never do.
pub fn survival(grid: &Grid, config: &GateConfig, spawn: Chunk, protectors: &[Chunk]) -> Probability {
    if !grid.contains(spawn) {
        return 0.0;
    }
    protectors
        .iter()
        .map(|&p| 1.0 - threat(config, grid.distance(spawn, p)))
        .product()
}

/// Vectorized survival for every chunk on the grid. `row` is a reusable
/// distance scratch buffer of length G².
pub fn survival_into(
    grid: &Grid,
    config: &GateConfig,
    protectors: &[Chunk],
    row: &mut [f32],
    out: &mut [f32],
) {
    out.fill(1.0);
    for &p in protectors {
        grid.distance_row(p, row);
        for (s, &d) in out.iter_mut().zip(row.iter()) {
            *s *= 1.0 - threat(config, d);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Grid, GateConfig) {
        (Grid::new(16), GateConfig::default())
    }

    #[test]
    fn no_protectors_means_certain_survival() {
        let (grid, config) = setup();
        assert!(survival(&grid, &config, 50, &[]) == 1.0);
    }

    #[test]
    fn protector_on_spawn_chunk_means_certain_death() {
        let (grid, config) = setup();
        assert!(survival(&grid, &config, 50, &[50]) == 0.0);
    }

    #[test]
    fn distant_protector_is_nearly_harmless() {
        let (grid, config) = setup();
        // corner to corner is far beyond the safe range
        assert!(survival(&grid, &config, 0, &[255]) >= 1.0 - 1e-6);
    }

    #[test]
    fn survival_stays_in_unit_interval() {
        let (grid, config) = setup();
        for spawn in [0, 17, 100, 255] {
            for protectors in [vec![], vec![0], vec![16, 33], vec![99, 100, 101]] {
                let s = survival(&grid, &config, spawn, &protectors);
                assert!((0.0..=1.0).contains(&s));
            }
        }
    }

    #[test]
    fn more_protectors_never_help() {
        let (grid, config) = setup();
        let one = survival(&grid, &config, 50, &[45]);
        let two = survival(&grid, &config, 50, &[45, 55]);
        assert!(two < one);
    }

    #[test]
    fn invalid_spawn_never_survives() {
        let (grid, config) = setup();
        assert!(survival(&grid, &config, -1, &[]) == 0.0);
        assert!(survival(&grid, &config, 256, &[]) == 0.0);
    }

    #[test]
    fn vectorized_matches_scalar() {
        let (grid, config) = setup();
        let protectors = vec![34, 120, 200];
        let mut row = vec![0.0; grid.chunks()];
        let mut all = vec![0.0; grid.chunks()];
        survival_into(&grid, &config, &protectors, &mut row, &mut all);
        for spawn in 0..grid.chunks() as Chunk {
            let scalar = survival(&grid, &config, spawn, &protectors);
            assert!((all[spawn as usize] - scalar).abs() < 1e-6);
        }
    }
}
