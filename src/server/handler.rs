use super::engine::Engine;
use super::envelope::now;
use super::envelope::Envelope;
use crate::errors::EngineError;

/// Route one validated envelope to its handler. Returns None for
/// fire-and-forget messages (`spawn_result` on success).
pub async fn dispatch(engine: &Engine, envelope: Envelope) -> Option<Envelope> {
    log::debug!("handling '{}' message", envelope.kind);
    match envelope.kind.as_str() {
        "observation_data" => Some(engine.handle_observation(&envelope)),
        "spawn_result" => engine.handle_spawn_result(&envelope),
        "reset_nn" => Some(engine.handle_reset(&envelope)),
        "ping" => Some(envelope.reply(
            "pong",
            serde_json::json!({
                "clientTimestamp": envelope.timestamp,
                "serverTimestamp": now(),
            }),
        )),
        "health_check" => Some(envelope.reply("health_response", engine.health())),
        "gate_stats_request" => Some(envelope.reply("gate_stats_response", engine.gate_stats())),
        "training_status_request" => {
            Some(envelope.reply("training_status_response", engine.training_status()))
        }
        "background_training_stats_request" => Some(envelope.reply(
            "background_training_stats_response",
            engine.background_training_stats(),
        )),
        // higher-level subsystems consume these; the core only acknowledges
        kind @ ("queen_death" | "queen_success" | "game_outcome") => {
            log::info!("forwarding '{}' out of core", kind);
            Some(envelope.reply(
                &format!("{}_response", kind),
                serde_json::json!({"status": "acknowledged"}),
            ))
        }
        other => Some(envelope.error(&EngineError::invalid(
            "type",
            format!("unsupported message type '{}'", other),
        ))),
    }
}

pub fn supported_types() -> &'static [&'static str] {
    &[
        "observation_data",
        "spawn_result",
        "reset_nn",
        "ping",
        "health_check",
        "gate_stats_request",
        "training_status_request",
        "background_training_stats_request",
        "queen_death",
        "queen_success",
        "game_outcome",
    ]
}
