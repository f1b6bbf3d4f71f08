use super::experience::Experience;
use crate::errors::BufferError;
use crate::Reward;
use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::time::Duration;

/// Bounded FIFO of experiences shared between the observation path
/// (insert + settle pending) and the trainer (sample). One lock guards
/// everything; acquisition is bounded by a timeout so a stalled reader
/// surfaces as a typed error instead of wedging the request path.
///
/// Entries are addressed by monotonically increasing sequence numbers,
/// which stay valid across FIFO eviction; the per-territory pending map
/// holds sequence numbers, never positions.
pub struct ReplayBuffer {
    inner: Mutex<Inner>,
    capacity: usize,
    timeout: Duration,
}

struct Inner {
    entries: VecDeque<Experience>,
    front_seq: u64,
    pending: HashMap<String, u64>,
    rng: SmallRng,
}

impl ReplayBuffer {
    pub fn new(capacity: usize, timeout: Duration, seed: u64) -> Self {
        assert!(capacity > 0, "buffer capacity must be positive");
        Self {
            inner: Mutex::new(Inner {
                entries: VecDeque::with_capacity(capacity),
                front_seq: 0,
                pending: HashMap::new(),
                rng: SmallRng::seed_from_u64(seed),
            }),
            capacity,
            timeout,
        }
    }

    fn lock(&self) -> Result<parking_lot::MutexGuard<'_, Inner>, BufferError> {
        self.inner
            .try_lock_for(self.timeout)
            .ok_or(BufferError::LockTimeout(self.timeout))
    }

    /// Insert an experience, evicting the oldest entry on overflow. A
    /// pending insert while the territory still has an unresolved row
    /// force-settles the old row with its own expected reward first, so
    /// at most one pending experience exists per territory.
    pub fn add(&self, experience: Experience) -> Result<(), BufferError> {
        let mut inner = self.lock()?;
        if experience.is_pending() {
            if let Some(seq) = inner.pending.remove(&experience.territory) {
                log::warn!(
                    "territory {} re-entered with an unresolved experience, settling with expected",
                    experience.territory,
                );
                if let Some(stale) = inner.entry_mut(seq) {
                    stale.actual = Some(stale.expected);
                }
            }
        }
        if inner.entries.len() == self.capacity {
            let evicted = inner.entries.pop_front();
            inner.front_seq += 1;
            if let Some(evicted) = evicted.filter(Experience::is_pending) {
                inner.pending.remove(&evicted.territory);
                log::warn!("evicted a still-pending experience for {}", evicted.territory);
            }
        }
        let seq = inner.front_seq + inner.entries.len() as u64;
        if experience.is_pending() {
            inner.pending.insert(experience.territory.clone(), seq);
        }
        inner.entries.push_back(experience);
        Ok(())
    }

    /// Settle the territory's pending experience. The reward written
    /// here is final: a row resolves exactly once.
    pub fn update_pending_reward(&self, territory: &str, reward: Reward) -> Result<(), BufferError> {
        let mut inner = self.lock()?;
        let seq = inner
            .pending
            .remove(territory)
            .ok_or_else(|| BufferError::NoPending(territory.to_string()))?;
        if let Some(entry) = inner.entry_mut(seq) {
            entry.actual = Some(reward);
        }
        Ok(())
    }

    /// Uniform sample without replacement over the resolved entries;
    /// returns fewer when the buffer holds fewer. Pending rows are
    /// never sampled.
    pub fn sample(&self, batch: usize) -> Result<Vec<Experience>, BufferError> {
        let mut inner = self.lock()?;
        let resolved: Vec<usize> = inner
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.is_pending())
            .map(|(i, _)| i)
            .collect();
        let take = batch.min(resolved.len());
        let picks = rand::seq::index::sample(&mut inner.rng, resolved.len(), take);
        Ok(picks
            .into_iter()
            .map(|i| inner.entries[resolved[i]].clone())
            .collect())
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pending_count(&self) -> usize {
        self.inner.lock().pending.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn fill_ratio(&self) -> f32 {
        self.len() as f32 / self.capacity as f32
    }

    pub fn clear(&self) -> Result<(), BufferError> {
        let mut inner = self.lock()?;
        inner.entries.clear();
        inner.pending.clear();
        inner.front_seq = 0;
        Ok(())
    }
}

impl Inner {
    fn entry_mut(&mut self, seq: u64) -> Option<&mut Experience> {
        let index = seq.checked_sub(self.front_seq)? as usize;
        self.entries.get_mut(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::SpawnType;

    fn buffer(capacity: usize) -> ReplayBuffer {
        ReplayBuffer::new(capacity, Duration::from_millis(100), 42)
    }

    fn experience(territory: &str, pending: bool) -> Experience {
        Experience {
            features: vec![0.5; 4],
            chunk: 51,
            spawn_type: Some(SpawnType::Energy),
            expected: 0.6,
            actual: if pending { None } else { Some(0.3) },
            territory: territory.to_string(),
            timestamp: 1.0,
            model_version: 0,
        }
    }

    #[test]
    fn sampling_never_returns_pending_rows() {
        let buffer = buffer(16);
        buffer.add(experience("a", true)).unwrap();
        for _ in 0..5 {
            buffer.add(experience("done", false)).unwrap();
        }
        for _ in 0..20 {
            let batch = buffer.sample(8).unwrap();
            assert!(batch.iter().all(|e| !e.is_pending()));
            assert!(batch.len() == 5);
        }
    }

    #[test]
    fn at_most_one_pending_per_territory() {
        let buffer = buffer(16);
        buffer.add(experience("a", true)).unwrap();
        buffer.add(experience("a", true)).unwrap();
        assert!(buffer.pending_count() == 1);
        assert!(buffer.len() == 2);
        // the displaced row settled with its expected reward
        let resolved = buffer.sample(16).unwrap();
        assert!(resolved.len() == 1);
        assert!(resolved[0].actual == Some(0.6));
    }

    #[test]
    fn pending_resolves_exactly_once_with_last_update() {
        let buffer = buffer(16);
        buffer.add(experience("a", true)).unwrap();
        buffer.update_pending_reward("a", 0.9).unwrap();
        assert!(buffer.pending_count() == 0);
        assert!(matches!(
            buffer.update_pending_reward("a", -0.9),
            Err(BufferError::NoPending(_))
        ));
        let batch = buffer.sample(4).unwrap();
        assert!(batch[0].actual == Some(0.9));
    }

    #[test]
    fn overflow_evicts_the_oldest() {
        let buffer = buffer(4);
        for i in 0..6 {
            buffer.add(experience(&format!("t{}", i), false)).unwrap();
        }
        assert!(buffer.len() == 4);
        let batch = buffer.sample(16).unwrap();
        assert!(batch.iter().all(|e| e.territory != "t0" && e.territory != "t1"));
    }

    #[test]
    fn eviction_keeps_pending_sequences_valid() {
        let buffer = buffer(4);
        for i in 0..4 {
            buffer.add(experience(&format!("t{}", i), false)).unwrap();
        }
        buffer.add(experience("late", true)).unwrap();
        // two more evictions shift the deque under the pending row
        buffer.add(experience("x", false)).unwrap();
        buffer.add(experience("y", false)).unwrap();
        buffer.update_pending_reward("late", 0.7).unwrap();
        let batch = buffer.sample(16).unwrap();
        let late = batch.iter().find(|e| e.territory == "late").unwrap();
        assert!(late.actual == Some(0.7));
    }

    #[test]
    fn clear_resets_everything() {
        let buffer = buffer(8);
        buffer.add(experience("a", true)).unwrap();
        buffer.add(experience("b", false)).unwrap();
        buffer.clear().unwrap();
        assert!(buffer.is_empty());
        assert!(buffer.pending_count() == 0);
    }

    #[test]
    fn sampling_is_deterministic_under_a_seed() {
        let run = |seed: u64| {
            let buffer = ReplayBuffer::new(16, Duration::from_millis(100), seed);
            for i in 0..10 {
                buffer.add(experience(&format!("t{}", i), false)).unwrap();
            }
            buffer
                .sample(4)
                .unwrap()
                .into_iter()
                .map(|e| e.territory)
                .collect::<Vec<_>>()
        };
        assert!(run(7) == run(7));
    }
}
