use crate::errors::EngineError;
use crate::grid::Grid;
use crate::observation::Observation;
use crate::Chunk;
use crate::FEATURES;

/// Turns a raw observation into the fixed-width normalized vector the
/// policy network consumes. Deterministic and total: identical
/// observations yield byte-identical vectors, missing entity lists read
/// as empty, counts are clipped before scaling.
pub struct FeatureExtractor {
    grid: Grid,
}

const WORKER_SCALE: f32 = 12.0;
const PROTECTOR_SCALE: f32 = 6.0;
const PARASITE_SCALE: f32 = 8.0;
const QUEEN_ENERGY_SCALE: f32 = 100.0;
const RESOURCE_SCALE: f32 = 1000.0;
const RATE_SCALE: f32 = 100.0;

impl FeatureExtractor {
    pub fn new(grid: Grid) -> Self {
        Self { grid }
    }

    pub fn extract(&self, obs: &Observation) -> Result<[f32; FEATURES], EngineError> {
        if obs.territory_id.is_empty() {
            return Err(EngineError::invalid("territoryId", "must be non-empty"));
        }
        if !obs.timestamp.is_finite() || obs.timestamp < 0.0 {
            return Err(EngineError::invalid("timestamp", "must be a non-negative number"));
        }

        let workers = obs.worker_chunks();
        let protectors = obs.protector_chunks();
        let edge = (self.grid.per_axis() - 1) as f32;
        let (hx, hy) = self.grid.coords(obs.hive_chunk);

        let mut f = [0.0f32; FEATURES];
        f[0] = scaled(obs.mining_workers.len(), WORKER_SCALE);
        f[1] = scaled(obs.workers_present.len(), WORKER_SCALE);
        f[2] = scaled(obs.protectors.len(), PROTECTOR_SCALE);
        f[3] = scaled(obs.parasites_start.len(), PARASITE_SCALE);
        f[4] = scaled(obs.parasites_end.len(), PARASITE_SCALE);
        f[5] = centered(
            obs.parasites_end.len() as f32 - obs.parasites_start.len() as f32,
            2.0 * PARASITE_SCALE,
        );
        f[6] = (obs.queen_energy.current / QUEEN_ENERGY_SCALE).clamp(0.0, 1.0);
        f[7] = 1.0 - f[6];
        f[8] = (obs.player_energy.end / RESOURCE_SCALE).clamp(0.0, 1.0);
        f[9] = (obs.player_minerals.end / RESOURCE_SCALE).clamp(0.0, 1.0);
        f[10] = centered(obs.player_energy.delta(), RATE_SCALE);
        f[11] = centered(obs.player_minerals.delta(), RATE_SCALE);
        f[12] = hx / edge;
        f[13] = hy / edge;
        let (wx, wy) = self.centroid(&workers);
        f[14] = wx / edge;
        f[15] = wy / edge;
        let (px, py) = self.centroid(&protectors);
        f[16] = px / edge;
        f[17] = py / edge;
        f[18] = self.mean_distance_to(&workers, obs.hive_chunk, 0.0);
        f[19] = self.mean_distance_to(&protectors, obs.hive_chunk, 0.0);
        f[20] = self.closest_pair(&workers, &protectors);
        f[21] = self.spread(&workers);
        f[22] = self.spread(&protectors);
        f[23] = if obs.workers_present.is_empty() {
            0.0
        } else {
            (obs.mining_workers.len() as f32 / obs.workers_present.len() as f32).clamp(0.0, 1.0)
        };
        f[24] = scaled(occupied(&workers), WORKER_SCALE);
        f[25] = scaled(occupied(&protectors), PROTECTOR_SCALE);
        f[26] = self.nearest_to(&workers, obs.hive_chunk);
        f[27] = self.nearest_to(&protectors, obs.hive_chunk);
        Ok(f)
    }

    fn centroid(&self, chunks: &[Chunk]) -> (f32, f32) {
        if chunks.is_empty() {
            let mid = (self.grid.per_axis() - 1) as f32 / 2.0;
            return (mid, mid);
        }
        let (mut sx, mut sy) = (0.0, 0.0);
        for &c in chunks {
            let (x, y) = self.grid.coords(c);
            sx += x;
            sy += y;
        }
        let n = chunks.len() as f32;
        (sx / n, sy / n)
    }

    fn mean_distance_to(&self, chunks: &[Chunk], target: Chunk, empty: f32) -> f32 {
        if chunks.is_empty() {
            return empty;
        }
        let sum: f32 = chunks.iter().map(|&c| self.grid.distance(c, target)).sum();
        self.grid.normalized(sum / chunks.len() as f32)
    }

    fn nearest_to(&self, chunks: &[Chunk], target: Chunk) -> f32 {
        chunks
            .iter()
            .map(|&c| self.grid.distance(c, target))
            .fold(None, |best: Option<f32>, d| {
                Some(best.map_or(d, |b| b.min(d)))
            })
            .map(|d| self.grid.normalized(d))
            .unwrap_or(1.0)
    }

    fn closest_pair(&self, a: &[Chunk], b: &[Chunk]) -> f32 {
        if a.is_empty() || b.is_empty() {
            return 1.0;
        }
        let mut best = f32::MAX;
        for &x in a {
            for &y in b {
                best = best.min(self.grid.distance(x, y));
            }
        }
        self.grid.normalized(best)
    }

    /// mean distance to the group centroid, a cheap clustering summary
    fn spread(&self, chunks: &[Chunk]) -> f32 {
        if chunks.len() < 2 {
            return 0.0;
        }
        let (cx, cy) = self.centroid(chunks);
        let sum: f32 = chunks
            .iter()
            .map(|&c| {
                let (x, y) = self.grid.coords(c);
                ((x - cx).powi(2) + (y - cy).powi(2)).sqrt()
            })
            .sum();
        self.grid.normalized(sum / chunks.len() as f32)
    }
}

fn scaled(count: usize, scale: f32) -> f32 {
    (count as f32).min(scale) / scale
}

/// map a signed rate into [0,1] around 0.5
fn centered(value: f32, scale: f32) -> f32 {
    (0.5 + value / scale).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Arbitrary;

    fn extractor() -> FeatureExtractor {
        FeatureExtractor::new(Grid::new(16))
    }

    #[test]
    fn extraction_is_deterministic() {
        let extractor = extractor();
        for _ in 0..16 {
            let obs = Observation::random();
            let a = extractor.extract(&obs).unwrap();
            let b = extractor.extract(&obs).unwrap();
            assert!(a.iter().zip(b.iter()).all(|(x, y)| x.to_bits() == y.to_bits()));
        }
    }

    #[test]
    fn all_features_are_bounded() {
        let extractor = extractor();
        for _ in 0..32 {
            let obs = Observation::random();
            let f = extractor.extract(&obs).unwrap();
            assert!(f.iter().all(|v| (0.0..=1.0).contains(v)), "{:?}", f);
        }
    }

    #[test]
    fn empty_lists_default_cleanly() {
        let extractor = extractor();
        let mut obs = Observation::random();
        obs.mining_workers.clear();
        obs.workers_present.clear();
        obs.protectors.clear();
        let f = extractor.extract(&obs).unwrap();
        assert!(f[0] == 0.0 && f[1] == 0.0 && f[2] == 0.0);
        assert!(f[20] == 1.0);
        assert!(f[26] == 1.0 && f[27] == 1.0);
    }

    #[test]
    fn empty_territory_is_invalid() {
        let extractor = extractor();
        let mut obs = Observation::random();
        obs.territory_id.clear();
        assert!(extractor.extract(&obs).is_err());
    }
}
