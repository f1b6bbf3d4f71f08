use super::engine::Engine;
use crate::config::load_gate_config;
use crate::config::ServerConfig;
use actix_web::web;
use std::time::Duration;
use std::time::SystemTime;

/// Poll the gate-config file's mtime and hot-swap the gate section
/// when it changes. An invalid file logs a warning and the previous
/// configuration stays in force.
pub fn spawn_gate_reload(engine: web::Data<Engine>, server: &ServerConfig) {
    let path = match &server.gate_config_path {
        Some(path) => path.clone(),
        None => return,
    };
    let interval = Duration::from_secs(server.reload_interval_secs.max(1));
    log::info!("watching {} for gate config changes", path.display());
    tokio::spawn(async move {
        let mut last_seen: Option<SystemTime> = None;
        loop {
            tokio::time::sleep(interval).await;
            let modified = match std::fs::metadata(&path).and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) => {
                    log::debug!("gate config not readable: {}", e);
                    continue;
                }
            };
            if last_seen == Some(modified) {
                continue;
            }
            match load_gate_config(&path) {
                Ok(config) => {
                    engine.reload_gate(config);
                    last_seen = Some(modified);
                }
                Err(e) => {
                    log::warn!("gate config reload rejected, keeping previous: {}", e);
                    last_seen = Some(modified);
                }
            }
        }
    });
}
