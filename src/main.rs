use std::{io, sync::Arc};
use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use env_logger::Env;
use funscript_sync::{
    config::Settings,
    device::{DeviceCommander, Disconnected, IntifaceDevice},
    handlers::types::AppState,
    routes,
    sync::SyncEngine,
};
use log::{error, info, warn};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let settings = Settings::from_env().map_err(|e| {
        error!("Invalid configuration: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e)
    })?;

    let intiface = match IntifaceDevice::connect(
        &settings.intiface_url,
        settings.device_mode,
        settings.scan_duration,
    )
    .await
    {
        Ok(device) => Some(Arc::new(device)),
        Err(e) => {
            warn!("Continuing without a device: {}", e);
            None
        }
    };
    let device: Arc<dyn DeviceCommander> = match &intiface {
        Some(device) => device.clone() as Arc<dyn DeviceCommander>,
        None => Arc::new(Disconnected),
    };

    let engine = SyncEngine::new(device, settings.engine_options());
    let app_state = web::Data::new(AppState {
        engine,
        funscript_dir: settings.funscript_dir.clone(),
    });

    info!("Listening on {}", settings.bind_addr);
    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .configure(routes::setup_routes)
    })
    .bind(&settings.bind_addr)?
    .run()
    .await?;

    if let Some(device) = intiface {
        if let Err(e) = device.disconnect().await {
            warn!("Failed to disconnect from Intiface: {}", e);
        }
    }
    Ok(())
}
