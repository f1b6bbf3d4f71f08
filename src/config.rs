use crate::errors::EngineError;
use crate::gate::GateConfig;
use crate::sim::SimConfig;
use crate::trainer::TrainerConfig;
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub per_axis: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { per_axis: 16 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub workers: usize,
    /// budget for one message end to end, including supervised updates
    pub message_timeout_secs: u64,
    /// gate section hot-reload source; absent means no watcher
    pub gate_config_path: Option<PathBuf>,
    pub reload_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            workers: 4,
            message_timeout_secs: 120,
            gate_config_path: None,
            reload_interval_secs: 5,
        }
    }
}

/// The whole configuration tree, bound to one YAML document. Sections
/// fall back to their defaults when omitted; an invalid tree aborts
/// boot rather than limping along.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub grid: GridConfig,
    pub gate: GateConfig,
    pub training: TrainerConfig,
    pub sim: SimConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let text = std::fs::read_to_string(path).map_err(|e| EngineError::Config {
            name: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let config: Self = serde_yaml::from_str(&text).map_err(|e| EngineError::Config {
            name: path.display().to_string(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self, EngineError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.grid.per_axis < 2 {
            return Err(EngineError::Config {
                name: "grid.per_axis".to_string(),
                reason: "must be at least 2".to_string(),
            });
        }
        self.gate.validate()?;
        self.sim.validate()?;
        if self.training.batch_size == 0 || self.training.buffer_capacity == 0 {
            return Err(EngineError::Config {
                name: "training".to_string(),
                reason: "batch_size and buffer_capacity must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Load just the gate section from a standalone YAML file, used by the
/// runtime reload watcher. Accepts either a bare gate mapping or a full
/// config document with a `gate:` key.
pub fn load_gate_config(path: &Path) -> Result<GateConfig, EngineError> {
    let text = std::fs::read_to_string(path).map_err(|e| EngineError::Config {
        name: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let value: serde_yaml::Value = serde_yaml::from_str(&text).map_err(|e| EngineError::Config {
        name: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let section = match value.get("gate") {
        Some(gate) => gate.clone(),
        None => value,
    };
    let config: GateConfig = serde_yaml::from_value(section).map_err(|e| EngineError::Config {
        name: path.display().to_string(),
        reason: e.to_string(),
    })?;
    config.validate()?;
    Ok(config)
}
