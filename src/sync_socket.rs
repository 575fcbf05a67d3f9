// src/sync_socket.rs

//! WebSocket bridge between the video player and the sync engine
//!
//! Text frames from the browser carry the player's position in milliseconds
//! and feed the drift corrector. Every engine event is pushed back as JSON.

use actix::{Actor, ActorContext, AsyncContext, StreamHandler};
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use log::{debug, error, info, warn};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use crate::{
    handlers::types::AppState,
    sync::{SyncEngine, SyncEvent},
};

pub struct SyncSocket {
    engine: SyncEngine,
}

impl SyncSocket {
    pub fn new(engine: SyncEngine) -> Self {
        Self { engine }
    }
}

impl Actor for SyncSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        ctx.add_stream(BroadcastStream::new(self.engine.subscribe()));
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for SyncSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => match parse_position(&text) {
                Some(time) => {
                    let drift = self.engine.update_reference_position(time);
                    debug!("Reference position {}ms: {:?}", time, drift);
                }
                None => warn!("Ignoring invalid position frame: {:?}", &*text),
            },
            Ok(ws::Message::Ping(msg)) => ctx.pong(&msg),
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Err(e) => {
                warn!("WebSocket protocol error: {}", e);
                ctx.stop();
            }
            _ => {}
        }
    }
}

impl StreamHandler<Result<SyncEvent, BroadcastStreamRecvError>> for SyncSocket {
    fn handle(&mut self, item: Result<SyncEvent, BroadcastStreamRecvError>, ctx: &mut Self::Context) {
        match item {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => ctx.text(json),
                Err(e) => error!("Failed to serialize event {:?}: {}", event, e),
            },
            Err(BroadcastStreamRecvError::Lagged(missed)) => {
                warn!("WebSocket client lagging, {} events dropped", missed);
            }
        }
    }
}

/// Parses a position frame in milliseconds. Negative values clamp to 0,
/// values past the `u64` range are rejected.
fn parse_position(text: &str) -> Option<u64> {
    let value = text
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v < u64::MAX as f64)?;
    Some(value.max(0.0).round() as u64)
}

pub async fn handle_ws_start(
    req: HttpRequest,
    stream: web::Payload,
    app: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    info!("WebSocket connection attempt");
    match ws::start(SyncSocket::new(app.engine.clone()), &req, stream) {
        Ok(response) => {
            info!("WebSocket connection established");
            Ok(response)
        }
        Err(e) => {
            error!("WebSocket error: {}", e);
            Err(e)
        }
    }
}
