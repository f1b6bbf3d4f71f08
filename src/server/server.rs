use super::engine::Engine;
use super::envelope::Envelope;
use super::handler;
use super::watcher;
use crate::config::AppConfig;
use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::web;
use actix_web::App;
use actix_web::HttpRequest;
use actix_web::HttpResponse;
use actix_web::HttpServer;
use actix_web::Responder;
use std::time::Duration;

pub struct Server;

impl Server {
    pub async fn run(config: AppConfig) -> anyhow::Result<()> {
        let bind = config.server.bind.clone();
        let workers = config.server.workers;
        let engine = Engine::new(config.clone()).map_err(|e| anyhow::anyhow!(e.to_string()))?;
        engine.start();
        let engine = web::Data::new(engine);
        watcher::spawn_gate_reload(engine.clone(), &config.server);
        let telemetry = engine.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            interval.tick().await;
            loop {
                interval.tick().await;
                log::info!("dashboard: {}", telemetry.background_training_stats());
            }
        });
        log::info!("starting AI server on {}", bind);
        HttpServer::new(move || {
            App::new()
                .wrap(Logger::new("%r %s %Ts"))
                .wrap(
                    Cors::default()
                        .allow_any_origin()
                        .allow_any_method()
                        .allow_any_header(),
                )
                .app_data(engine.clone())
                .route("/health", web::get().to(health))
                .route("/ws", web::get().to(connect))
        })
        .workers(workers)
        .bind(bind)?
        .run()
        .await?;
        Ok(())
    }
}

async fn health(engine: web::Data<Engine>) -> impl Responder {
    HttpResponse::Ok().json(engine.health())
}

async fn connect(
    engine: web::Data<Engine>,
    req: HttpRequest,
    body: web::Payload,
) -> impl Responder {
    match actix_ws::handle(&req, body) {
        Ok((response, session, stream)) => {
            log::info!("client connected");
            actix_web::rt::spawn(bridge(engine, session, stream));
            response.map_into_left_body()
        }
        Err(e) => HttpResponse::InternalServerError()
            .body(e.to_string())
            .map_into_right_body(),
    }
}

/// Per-connection loop. Messages from one client process strictly in
/// arrival order, which is what keeps the per-territory pending
/// experience pairing correct. Suspension happens only at the socket.
async fn bridge(
    engine: web::Data<Engine>,
    mut session: actix_ws::Session,
    mut stream: actix_ws::MessageStream,
) {
    use futures::StreamExt;
    let timeout = Duration::from_secs(engine.config().server.message_timeout_secs);
    'sesh: loop {
        match stream.next().await {
            Some(Ok(actix_ws::Message::Text(text))) => {
                let reply = match Envelope::parse(&text) {
                    Ok(envelope) => {
                        let correlation = envelope.clone();
                        match tokio::time::timeout(timeout, handler::dispatch(&engine, envelope)).await {
                            Ok(reply) => reply,
                            Err(_) => {
                                log::error!("message handling exceeded {:?}", timeout);
                                Some(correlation.error(&crate::errors::EngineError::GateEvaluation(
                                    "message handling timed out".to_string(),
                                )))
                            }
                        }
                    }
                    Err(e) => Some(Envelope::new("error", serde_json::json!({
                        "error": e.to_string(),
                        "errorCode": e.code(),
                        "status": "error",
                        "retryable": e.retryable(),
                        "supportedMessageTypes": handler::supported_types(),
                    }))),
                };
                if let Some(reply) = reply {
                    let json = match serde_json::to_string(&reply) {
                        Ok(json) => json,
                        Err(e) => {
                            log::error!("response serialization failed: {}", e);
                            continue 'sesh;
                        }
                    };
                    if session.text(json).await.is_err() {
                        break 'sesh;
                    }
                }
            }
            Some(Ok(actix_ws::Message::Ping(bytes))) => {
                if session.pong(&bytes).await.is_err() {
                    break 'sesh;
                }
            }
            Some(Ok(actix_ws::Message::Close(_))) | Some(Err(_)) | None => break 'sesh,
            _ => continue 'sesh,
        }
    }
    log::info!("client disconnected");
}
