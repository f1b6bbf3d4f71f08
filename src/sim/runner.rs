use super::config::SimConfig;
use super::curriculum::default_curriculum;
use super::curriculum::CurriculumManager;
use super::simulator::Simulator;
use super::state::SIM_TERRITORY;
use crate::observation::SpawnType;
use crate::server::Envelope;
use crate::Chunk;
use futures::SinkExt;
use futures::StreamExt;
use std::time::Duration;
use std::time::Instant;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

#[derive(Debug, Clone)]
pub struct RunnerOptions {
    pub url: String,
    pub ticks: u64,
    pub turbo: bool,
    pub continuous: bool,
    pub curriculum: bool,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8000/ws".to_string(),
            ticks: 1_000,
            turbo: false,
            continuous: false,
            curriculum: false,
        }
    }
}

pub fn apply_turbo(config: &mut SimConfig, options: &RunnerOptions) {
    if options.turbo {
        config.turbo_mode = true;
        config.tick_interval_ms = 0;
    }
}

/// Drive the simulator against a running AI server: one observation
/// per tick, spawns applied when the gate says SEND, failed spawns
/// reported back so the pending experience settles honestly.
pub async fn run(mut config: SimConfig, options: RunnerOptions) -> anyhow::Result<()> {
    apply_turbo(&mut config, &options);
    config.validate().map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let mut curriculum = if options.curriculum {
        let manager = CurriculumManager::new(default_curriculum())
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;
        let phase = manager.current();
        config.num_workers = phase.num_workers;
        config.num_protectors = phase.num_protectors;
        log::info!("curriculum enabled, starting in phase '{}'", phase.name);
        Some(manager)
    } else {
        None
    };
    let mut sim = Simulator::new(config.clone());

    log::info!("connecting to {}", options.url);
    let (stream, _) = connect_async(&options.url).await?;
    let (mut write, mut read) = stream.split();
    log::info!(
        "simulation started: {} workers, {} protectors, turbo={}",
        config.num_workers,
        config.num_protectors,
        config.turbo_mode,
    );

    let bar = (!options.continuous).then(|| crate::progress(options.ticks as usize));
    let started = Instant::now();
    let mut ticks: u64 = 0;
    let mut spawns: u64 = 0;
    loop {
        if !options.continuous && ticks >= options.ticks {
            break;
        }
        ticks += 1;
        if let Some(manager) = curriculum.as_mut() {
            if let Some(phase) = manager.tick() {
                let (workers, protectors) = (phase.num_workers, phase.num_protectors);
                sim.reshape(workers, protectors);
            }
        }
        let obs = sim.tick();
        let envelope = Envelope::new("observation_data", serde_json::to_value(&obs)?);
        write
            .send(Message::Text(serde_json::to_string(&envelope)?.into()))
            .await?;

        // wait for this tick's decision; other frames are telemetry
        while let Some(msg) = read.next().await {
            let text = match msg? {
                Message::Text(text) => text,
                Message::Close(_) => anyhow::bail!("server closed the connection"),
                _ => continue,
            };
            let reply: Envelope = match serde_json::from_str(text.as_str()) {
                Ok(reply) => reply,
                Err(e) => {
                    log::warn!("unparseable frame: {}", e);
                    continue;
                }
            };
            if reply.kind == "error" {
                log::warn!("server error: {}", reply.data["error"]);
                break;
            }
            if reply.kind != "observation_response" {
                continue;
            }
            if reply.data["gateDecision"] == "SEND" {
                let chunk = reply.data["spawnChunk"].as_i64().unwrap_or(-1) as Chunk;
                let kind = serde_json::from_value::<SpawnType>(reply.data["spawnType"].clone())
                    .unwrap_or(SpawnType::Energy);
                if sim.spawn_parasite(chunk, kind) {
                    spawns += 1;
                } else {
                    let result = Envelope::new(
                        "spawn_result",
                        serde_json::json!({
                            "success": false,
                            "territoryId": SIM_TERRITORY,
                            "spawnChunk": chunk,
                            "spawnType": kind,
                            "reason": "insufficient_energy",
                        }),
                    );
                    write
                        .send(Message::Text(serde_json::to_string(&result)?.into()))
                        .await?;
                }
            }
            break;
        }

        if let Some(bar) = &bar {
            bar.inc(1);
        }
        if !config.turbo_mode && config.tick_interval_ms > 0 {
            tokio::time::sleep(Duration::from_millis(config.tick_interval_ms)).await;
        }
    }
    if let Some(bar) = bar {
        bar.finish();
    }
    write.send(Message::Close(None)).await.ok();

    let elapsed = started.elapsed().as_secs_f64().max(1e-6);
    log::info!(
        "simulation finished: {} ticks in {:.2}s ({:.1} tps), {} spawns executed",
        ticks,
        elapsed,
        ticks as f64 / elapsed,
        spawns,
    );
    log::info!(
        "final state: {} workers, {} protectors, {} parasites, queen energy {:.1}",
        sim.state.workers.len(),
        sim.state.protectors.len(),
        sim.state.parasites.len(),
        sim.state.queen_energy,
    );
    if let Some(manager) = curriculum {
        log::info!("curriculum progress: {}", manager.progress());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turbo_strips_the_tick_delay() {
        let mut config = SimConfig::default();
        let options = RunnerOptions {
            turbo: true,
            ..RunnerOptions::default()
        };
        apply_turbo(&mut config, &options);
        assert!(config.turbo_mode);
        assert!(config.tick_interval_ms == 0);
    }

    #[test]
    fn defaults_target_the_local_server() {
        let options = RunnerOptions::default();
        assert!(options.url.ends_with("/ws"));
        assert!(options.ticks == 1_000);
        assert!(!options.continuous);
    }
}
