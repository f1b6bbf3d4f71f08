use crate::errors::EngineError;

/// One stage of the training curriculum. `duration` is in ticks, with
/// -1 marking the terminal phase the simulation stays in forever.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurriculumPhase {
    pub name: String,
    pub duration: i64,
    pub num_workers: usize,
    pub num_protectors: usize,
}

impl CurriculumPhase {
    pub fn new(
        name: &str,
        duration: i64,
        num_workers: usize,
        num_protectors: usize,
    ) -> Result<Self, EngineError> {
        if duration == 0 || duration < -1 {
            return Err(EngineError::Config {
                name: format!("curriculum.{}", name),
                reason: "duration must be positive or -1".to_string(),
            });
        }
        Ok(Self {
            name: name.to_string(),
            duration,
            num_workers,
            num_protectors,
        })
    }

    pub fn is_terminal(&self) -> bool {
        self.duration == -1
    }
}

/// Walks an ordered list of phases, reshaping the simulated population
/// on each transition.
#[derive(Debug, Clone)]
pub struct CurriculumManager {
    phases: Vec<CurriculumPhase>,
    index: usize,
    ticks_in_phase: u64,
}

impl CurriculumManager {
    pub fn new(phases: Vec<CurriculumPhase>) -> Result<Self, EngineError> {
        if phases.is_empty() {
            return Err(EngineError::Config {
                name: "curriculum".to_string(),
                reason: "needs at least one phase".to_string(),
            });
        }
        Ok(Self {
            phases,
            index: 0,
            ticks_in_phase: 0,
        })
    }

    pub fn current(&self) -> &CurriculumPhase {
        &self.phases[self.index]
    }

    /// Advance one tick; returns the new phase on a transition.
    pub fn tick(&mut self) -> Option<&CurriculumPhase> {
        self.ticks_in_phase += 1;
        let current = &self.phases[self.index];
        if !current.is_terminal()
            && self.ticks_in_phase >= current.duration as u64
            && self.index + 1 < self.phases.len()
        {
            self.index += 1;
            self.ticks_in_phase = 0;
            log::info!("curriculum advanced to phase '{}'", self.phases[self.index].name);
            return Some(&self.phases[self.index]);
        }
        None
    }

    pub fn progress(&self) -> serde_json::Value {
        let phase = self.current();
        serde_json::json!({
            "phase_index": self.index,
            "phase_name": phase.name,
            "ticks_in_phase": self.ticks_in_phase,
            "phase_duration": phase.duration,
            "progress_ratio": if phase.is_terminal() {
                serde_json::Value::Null
            } else {
                serde_json::json!(self.ticks_in_phase as f64 / phase.duration as f64)
            },
            "is_final_phase": self.index + 1 == self.phases.len(),
        })
    }
}

pub fn default_curriculum() -> Vec<CurriculumPhase> {
    vec![
        CurriculumPhase::new("basic", 2_000, 4, 0).expect("static phase"),
        CurriculumPhase::new("protected", 3_000, 6, 2).expect("static phase"),
        CurriculumPhase::new("full", -1, 8, 3).expect("static phase"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_and_subnegative_durations_are_invalid() {
        assert!(CurriculumPhase::new("bad", 0, 4, 2).is_err());
        assert!(CurriculumPhase::new("bad", -2, 4, 2).is_err());
        assert!(CurriculumPhase::new("ok", -1, 4, 2).is_ok());
    }

    #[test]
    fn empty_curriculum_is_invalid() {
        assert!(CurriculumManager::new(vec![]).is_err());
    }

    #[test]
    fn phases_transition_on_schedule() {
        let phases = vec![
            CurriculumPhase::new("phase1", 5, 2, 0).unwrap(),
            CurriculumPhase::new("phase2", 3, 4, 1).unwrap(),
            CurriculumPhase::new("phase3", -1, 6, 2).unwrap(),
        ];
        let mut manager = CurriculumManager::new(phases).unwrap();
        for _ in 0..4 {
            assert!(manager.tick().is_none());
        }
        let next = manager.tick().unwrap();
        assert!(next.name == "phase2");
        for _ in 0..2 {
            assert!(manager.tick().is_none());
        }
        let next = manager.tick().unwrap();
        assert!(next.name == "phase3");
        // terminal phase never transitions again
        for _ in 0..10 {
            assert!(manager.tick().is_none());
        }
        assert!(manager.current().name == "phase3");
    }

    #[test]
    fn progress_reports_ratio_and_terminal() {
        let phases = vec![
            CurriculumPhase::new("phase1", 10, 2, 0).unwrap(),
            CurriculumPhase::new("phase2", -1, 4, 1).unwrap(),
        ];
        let mut manager = CurriculumManager::new(phases).unwrap();
        for _ in 0..5 {
            manager.tick();
        }
        let progress = manager.progress();
        assert!(progress["ticks_in_phase"] == 5);
        assert!(progress["progress_ratio"] == 0.5);
        assert!(progress["is_final_phase"] == false);
        for _ in 0..5 {
            manager.tick();
        }
        let progress = manager.progress();
        assert!(progress["phase_name"] == "phase2");
        assert!(progress["progress_ratio"].is_null());
        assert!(progress["is_final_phase"] == true);
    }

    #[test]
    fn default_curriculum_ends_terminal() {
        let phases = default_curriculum();
        assert!(phases.len() == 3);
        assert!(phases[0].name == "basic");
        assert!(phases[0].num_protectors == 0);
        assert!(phases.last().unwrap().is_terminal());
    }
}
