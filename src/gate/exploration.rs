use super::config::GateConfig;
use crate::Chunk;
use crate::Tick;

/// Tracks when each chunk last received a spawn. The bonus collapses to
/// zero right after a spawn and recovers linearly toward the ceiling;
/// chunks never spawned at sit at the ceiling. It only ever breaks
/// ties, it cannot outvote danger or capacity.
#[derive(Debug, Clone)]
pub struct ExplorationTracker {
    last_spawn: Vec<Option<Tick>>,
    now: Tick,
}

impl ExplorationTracker {
    pub fn new(chunks: usize) -> Self {
        Self {
            last_spawn: vec![None; chunks],
            now: 0,
        }
    }

    /// one evaluation = one tick of recovery time
    pub fn advance(&mut self) {
        self.now += 1;
    }

    pub fn record_spawn(&mut self, chunk: Chunk) {
        if let Some(slot) = usize::try_from(chunk).ok().and_then(|c| self.last_spawn.get_mut(c)) {
            *slot = Some(self.now);
        }
    }

    pub fn bonus(&self, config: &GateConfig, chunk: Chunk) -> f32 {
        let slot = match usize::try_from(chunk).ok().and_then(|c| self.last_spawn.get(c)) {
            Some(slot) => slot,
            None => return 0.0,
        };
        match slot {
            None => config.exploration_ceiling,
            Some(last) => {
                let elapsed = self.now.saturating_sub(*last) as f32;
                let recovered = (elapsed / config.exploration_recovery as f32).min(1.0);
                config.exploration_ceiling * recovered
            }
        }
    }

    pub fn bonus_into(&self, config: &GateConfig, out: &mut [f32]) {
        for (chunk, o) in out.iter_mut().enumerate() {
            *o = self.bonus(config, chunk as Chunk);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unexplored_chunks_carry_the_ceiling() {
        let config = GateConfig::default();
        let tracker = ExplorationTracker::new(256);
        assert!(tracker.bonus(&config, 50) == config.exploration_ceiling);
    }

    #[test]
    fn fresh_spawn_zeroes_the_bonus() {
        let config = GateConfig::default();
        let mut tracker = ExplorationTracker::new(256);
        tracker.record_spawn(50);
        assert!(tracker.bonus(&config, 50) < 0.01);
    }

    #[test]
    fn bonus_recovers_with_time() {
        let config = GateConfig::default();
        let mut tracker = ExplorationTracker::new(256);
        tracker.record_spawn(50);
        for _ in 0..config.exploration_recovery / 2 {
            tracker.advance();
        }
        let halfway = tracker.bonus(&config, 50);
        assert!(halfway > 0.0 && halfway < config.exploration_ceiling);
        for _ in 0..config.exploration_recovery {
            tracker.advance();
        }
        assert!(tracker.bonus(&config, 50) == config.exploration_ceiling);
    }

    #[test]
    fn out_of_range_chunks_contribute_nothing() {
        let config = GateConfig::default();
        let mut tracker = ExplorationTracker::new(256);
        tracker.record_spawn(-1);
        tracker.record_spawn(999);
        assert!(tracker.bonus(&config, -1) == 0.0);
        assert!(tracker.bonus(&config, 999) == 0.0);
    }
}
