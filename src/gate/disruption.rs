use super::config::GateConfig;
use crate::grid::Grid;
use crate::Chunk;
use crate::Probability;

/// How much one worker at distance `d` is disturbed: linear falloff to
/// zero at the safe range.
pub fn falloff(config: &GateConfig, d: f32) -> f32 {
    (1.0 - d / config.safe_range).max(0.0)
}

/// Expected mining disruption of spawning at `spawn`: per-worker
/// falloffs summed, clamped to [0,1], then discounted by the parasite's
/// survival probability. A dead parasite disrupts nothing.
pub fn disruption(
    grid: &Grid,
    config: &GateConfig,
    spawn: Chunk,
    workers: &[Chunk],
    survival: Probability,
) -> f32 {
    let raw: f32 = workers
        .iter()
        .map(|&w| falloff(config, grid.distance(spawn, w)))
        .sum();
    raw.min(1.0) * survival
}

/// Vectorized disruption for every chunk, against precomputed per-chunk
/// survival. `row` is the shared distance scratch buffer.
pub fn disruption_into(
    grid: &Grid,
    config: &GateConfig,
    workers: &[Chunk],
    survival: &[f32],
    row: &mut [f32],
    out: &mut [f32],
) {
    out.fill(0.0);
    for &w in workers {
        grid.distance_row(w, row);
        for (acc, &d) in out.iter_mut().zip(row.iter()) {
            *acc += falloff(config, d);
        }
    }
    for (acc, &s) in out.iter_mut().zip(survival.iter()) {
        *acc = acc.min(1.0) * s;
    }
}
