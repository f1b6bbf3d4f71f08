use crate::grid::Grid;
use crate::Chunk;

/// Spawn placement penalty, always ≤ 0 and never a bonus. With no
/// workers visible ("idle mode") it grows with distance from the hive;
/// with workers present ("active mode") it grows with distance to the
/// nearest worker.
pub fn penalty(grid: &Grid, spawn: Chunk, hive: Chunk, workers: &[Chunk]) -> f32 {
    let distance = if workers.is_empty() {
        grid.distance(spawn, hive)
    } else {
        workers
            .iter()
            .map(|&w| grid.distance(spawn, w))
            .fold(f32::MAX, f32::min)
    };
    -grid.normalized(distance)
}

/// Vectorized penalty for every chunk. `row` and `nearest` are reusable
/// scratch buffers of length G².
pub fn penalty_into(
    grid: &Grid,
    hive: Chunk,
    workers: &[Chunk],
    row: &mut [f32],
    nearest: &mut [f32],
    out: &mut [f32],
) {
    if workers.is_empty() {
        grid.distance_row(hive, row);
        for (o, &d) in out.iter_mut().zip(row.iter()) {
            *o = -grid.normalized(d);
        }
        return;
    }
    nearest.fill(f32::MAX);
    for &w in workers {
        grid.distance_row(w, row);
        for (n, &d) in nearest.iter_mut().zip(row.iter()) {
            *n = n.min(d);
        }
    }
    for (o, &d) in out.iter_mut().zip(nearest.iter()) {
        *o = -grid.normalized(d);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_mode_is_free_at_the_hive() {
        let grid = Grid::new(16);
        assert!(penalty(&grid, 50, 50, &[]) == 0.0);
        assert!(penalty(&grid, 200, 50, &[]) < 0.0);
    }

    #[test]
    fn active_mode_is_free_at_a_worker() {
        let grid = Grid::new(16);
        assert!(penalty(&grid, 50, 0, &[50]) == 0.0);
        assert!(penalty(&grid, 200, 0, &[50]) < 0.0);
    }

    #[test]
    fn penalty_is_never_positive() {
        let grid = Grid::new(16);
        for spawn in [0, 17, 128, 255] {
            assert!(penalty(&grid, spawn, 136, &[]) <= 0.0);
            assert!(penalty(&grid, spawn, 136, &[40, 90]) <= 0.0);
        }
    }

    #[test]
    fn vectorized_matches_scalar() {
        let grid = Grid::new(16);
        let workers = vec![40, 90];
        let mut row = vec![0.0; grid.chunks()];
        let mut nearest = vec![0.0; grid.chunks()];
        let mut all = vec![0.0; grid.chunks()];
        penalty_into(&grid, 136, &workers, &mut row, &mut nearest, &mut all);
        for spawn in 0..grid.chunks() as Chunk {
            let scalar = penalty(&grid, spawn, 136, &workers);
            assert!((all[spawn as usize] - scalar).abs() < 1e-6);
        }
        penalty_into(&grid, 136, &[], &mut row, &mut nearest, &mut all);
        for spawn in 0..grid.chunks() as Chunk {
            let scalar = penalty(&grid, spawn, 136, &[]);
            assert!((all[spawn as usize] - scalar).abs() < 1e-6);
        }
    }
}
