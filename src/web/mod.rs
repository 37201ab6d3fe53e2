pub mod api;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use actix_web::web::{Data, ServiceConfig};
use actix_web::{App, HttpServer};
use chrono::{DateTime, Utc};
use tracing::info;

use crate::scanner::manager::ScanManager;

/// Shared state handed to every request handler
pub struct AppState {
    pub manager: Arc<ScanManager>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(manager: Arc<ScanManager>) -> Self {
        Self {
            manager,
            started_at: Utc::now(),
        }
    }
}

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(api::scan)
        .service(api::handshake)
        .service(api::handshake_history)
        .service(api::auto_connect)
        .service(api::status);
}

/// Serve the API until the server stops. Blocks the calling thread.
pub fn run(bind: SocketAddr, manager: Arc<ScanManager>) -> io::Result<()> {
    let sys = actix_rt::System::new();
    let state = Data::new(AppState::new(manager));

    sys.block_on(async move {
        info!(%bind, "Starting web server");
        HttpServer::new(move || App::new().app_data(state.clone()).configure(configure))
            .bind(bind)?
            .run()
            .await
    })
}
