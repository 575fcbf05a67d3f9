// src/handlers/playback.rs

//! Playback request handlers
//!
//! Thin JSON wrappers around the sync engine operations. Each handler maps
//! engine errors to an HTTP status and logs what it did.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use actix_web::{web, HttpResponse};
use log::{error, info, warn};
use crate::error::{ScriptError, SyncError};
use super::types::{
    AppState, ErrorResponse, LatencyRequest, LatencyResponse, LoadScriptRequest, PlayRequest,
    TimeRequest, TimeResponse,
};

/// Loads the funscript matching the requested video
///
/// # Returns
/// * `200` with the action count and duration
/// * `400` if the path has no file name
/// * `404` if the funscript does not exist
/// * `422` if the funscript is malformed or invalid
pub async fn load_script(
    payload: web::Json<LoadScriptRequest>,
    app: web::Data<AppState>,
) -> HttpResponse {
    info!("Handling funscript load for: {}", &payload.path);

    let funscript_path = match funscript_path_for(&payload.path, &app.funscript_dir) {
        Ok(p) => p,
        Err(e) => {
            warn!("Path determination error: {}", e);
            return HttpResponse::BadRequest().json(ErrorResponse::new(e));
        }
    };

    match app.engine.load_script_file(&funscript_path).await {
        Ok(summary) => HttpResponse::Ok().json(summary),
        Err(e) => error_response(&e),
    }
}

pub async fn play(payload: web::Json<PlayRequest>, app: web::Data<AppState>) -> HttpResponse {
    match app.engine.play(payload.start_time) {
        Ok(()) => HttpResponse::Ok().json(app.engine.status()),
        Err(e) => error_response(&e),
    }
}

pub async fn pause(app: web::Data<AppState>) -> HttpResponse {
    let time = app.engine.pause();
    HttpResponse::Ok().json(TimeResponse { time })
}

pub async fn resume(app: web::Data<AppState>) -> HttpResponse {
    match app.engine.resume() {
        Ok(()) => HttpResponse::Ok().json(app.engine.status()),
        Err(e) => error_response(&e),
    }
}

pub async fn seek(payload: web::Json<TimeRequest>, app: web::Data<AppState>) -> HttpResponse {
    app.engine.seek(payload.time);
    HttpResponse::Ok().json(TimeResponse { time: payload.time })
}

pub async fn stop(app: web::Data<AppState>) -> HttpResponse {
    match app.engine.stop().await {
        Ok(()) => HttpResponse::Ok().json(app.engine.status()),
        Err(e) => error_response(&e),
    }
}

pub async fn set_latency(payload: web::Json<LatencyRequest>, app: web::Data<AppState>) -> HttpResponse {
    let offset_ms = app.engine.set_latency_offset(payload.offset_ms);
    HttpResponse::Ok().json(LatencyResponse { offset_ms })
}

/// Reference position report from the video player
pub async fn report_position(payload: web::Json<TimeRequest>, app: web::Data<AppState>) -> HttpResponse {
    let drift = app.engine.update_reference_position(payload.time);
    HttpResponse::Ok().json(drift)
}

pub async fn status(app: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(app.engine.status())
}

/// Constructs the funscript path for a video: same file name, `.funscript`
/// extension, inside the funscript directory.
///
/// Only the file name of the request is used, so requests cannot escape the
/// funscript directory.
pub fn funscript_path_for(requested_path: &str, funscript_dir: &Path) -> Result<PathBuf, String> {
    let file_name = Path::new(requested_path.trim())
        .file_name()
        .ok_or_else(|| format!("Invalid requested path: {}", requested_path))?;

    Ok(funscript_dir.join(file_name).with_extension("funscript"))
}

fn error_response(err: &SyncError) -> HttpResponse {
    let body = ErrorResponse::new(err);
    match err {
        SyncError::NoScriptLoaded => HttpResponse::Conflict().json(body),
        SyncError::DeviceNotReady => HttpResponse::ServiceUnavailable().json(body),
        SyncError::Script(ScriptError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
            info!("Responding with 404 Not Found: {}", err);
            HttpResponse::NotFound().json(body)
        }
        SyncError::Script(ScriptError::Io { .. }) => {
            error!("Failed to read funscript: {}", err);
            HttpResponse::InternalServerError().json(body)
        }
        SyncError::Script(_) => {
            warn!("Rejected funscript: {}", err);
            HttpResponse::UnprocessableEntity().json(body)
        }
        SyncError::Device(_) => {
            error!("Device error: {}", err);
            HttpResponse::BadGateway().json(body)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn funscript_path_swaps_the_extension() {
        let dir = Path::new("/srv/scripts");
        assert_eq!(
            funscript_path_for("movies/clip one.mp4", dir).unwrap(),
            PathBuf::from("/srv/scripts/clip one.funscript")
        );
        assert_eq!(
            funscript_path_for("clip.funscript", dir).unwrap(),
            PathBuf::from("/srv/scripts/clip.funscript")
        );
    }

    #[test]
    fn funscript_path_cannot_escape_the_directory() {
        let dir = Path::new("/srv/scripts");
        assert_eq!(
            funscript_path_for("../../etc/passwd", dir).unwrap(),
            PathBuf::from("/srv/scripts/passwd.funscript")
        );
        assert!(funscript_path_for("..", dir).is_err());
        assert!(funscript_path_for("", dir).is_err());
    }
}
