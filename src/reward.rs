use crate::grid::Grid;
use crate::observation::Observation;
use crate::observation::SpawnType;
use crate::Chunk;
use crate::Reward;

/// Ground-truth reward derived from the next observation's resource
/// deltas. Pure and deterministic: the same pair of observations always
/// settles to the same reward.
///
/// The player gaining resources is bad for the queen, so the base term
/// is the negated, scaled sum of the mineral and energy deltas. Two
/// shaping terms read disruption evidence out of the follow-up
/// observation: protectors closing on the spawn chunk is good, the
/// parasite having died before the window is bad.
#[derive(Debug, Clone, Copy)]
pub struct RewardCalculator {
    resource_scale: f32,
    approach_bonus: f32,
    destroyed_penalty: f32,
}

impl Default for RewardCalculator {
    fn default() -> Self {
        Self {
            resource_scale: 0.05,
            approach_bonus: 0.1,
            destroyed_penalty: 0.2,
        }
    }
}

impl RewardCalculator {
    /// Reward for an executed spawn at `chunk`, judged one observation later.
    pub fn actual(
        &self,
        grid: &Grid,
        previous: &Observation,
        current: &Observation,
        chunk: Chunk,
        spawn_type: SpawnType,
    ) -> Reward {
        let d_minerals = current.player_minerals.end - previous.player_minerals.end;
        let d_energy = current.player_energy.end - previous.player_energy.end;
        let mut reward = (-(d_minerals + d_energy) * self.resource_scale).clamp(-1.0, 1.0);
        if self.protectors_closed_in(grid, previous, current, chunk) {
            reward += self.approach_bonus;
        }
        if self.parasite_destroyed(current, chunk, spawn_type) {
            reward -= self.destroyed_penalty;
        }
        reward.clamp(-1.0, 1.0)
    }

    fn protectors_closed_in(
        &self,
        grid: &Grid,
        previous: &Observation,
        current: &Observation,
        chunk: Chunk,
    ) -> bool {
        let mean = |obs: &Observation| {
            let chunks = obs.protector_chunks();
            if chunks.is_empty() {
                return None;
            }
            let sum: f32 = chunks.iter().map(|&p| grid.distance(p, chunk)).sum();
            Some(sum / chunks.len() as f32)
        };
        match (mean(previous), mean(current)) {
            (Some(before), Some(after)) => after < before,
            _ => false,
        }
    }

    /// the spawned parasite no longer shows up at its chunk by window end
    fn parasite_destroyed(&self, current: &Observation, chunk: Chunk, spawn_type: SpawnType) -> bool {
        !current
            .parasites_end
            .iter()
            .any(|p| p.chunk_id == chunk && p.r#type.map_or(true, |t| t == spawn_type))
    }
}
