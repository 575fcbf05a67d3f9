// src/routes.rs

//! Route configuration for the sync server.

use actix_web::web;
use crate::{handlers::playback, sync_socket};

/// Configures all routes for the web server.
///
/// # Routes
/// - `/ws` - WebSocket: player positions in, engine events out
/// - `/api` - Engine operations:
///   - `POST /script` - Load the funscript for a video
///   - `POST /play`, `/pause`, `/resume`, `/seek`, `/stop`
///   - `POST /latency` - Set the latency offset
///   - `POST /position` - Report the player position
///   - `GET /status` - Engine status
pub fn setup_routes(cfg: &mut web::ServiceConfig) {
    cfg
        .service(
            web::resource("/ws")
                .route(web::get().to(sync_socket::handle_ws_start))
        )
        .service(
            web::scope("/api")
                .route("/script", web::post().to(playback::load_script))
                .route("/play", web::post().to(playback::play))
                .route("/pause", web::post().to(playback::pause))
                .route("/resume", web::post().to(playback::resume))
                .route("/seek", web::post().to(playback::seek))
                .route("/stop", web::post().to(playback::stop))
                .route("/latency", web::post().to(playback::set_latency))
                .route("/position", web::post().to(playback::report_position))
                .route("/status", web::get().to(playback::status))
        );
}
