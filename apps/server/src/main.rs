#![warn(clippy::all, clippy::pedantic)]

use std::net::SocketAddr;
use std::path::PathBuf;

use actix_web::{App, HttpServer, web};
use clap::Parser;
use statusboard::{
    Config, Monitor, MonitorConfig, ServiceStatus, StatusTransition, SubscriptionStore, build_prober, format_duration,
};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};

mod error;
mod routes;
mod state;

use error::AppError;
use logger::init_tracing;
use state::AppState;

/// Service status dashboard backend
#[derive(Debug, Parser)]
#[command(name = "statusboard-server", version, about)]
struct Cli {
    /// Configuration file, created with defaults when missing
    #[arg(short, long, env = "STATUSBOARD_CONFIG")]
    config: Option<PathBuf>,
}

#[actix_web::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let mut config = Config::from_config(cli.config.as_ref())?;
    config.apply_env_overrides()?;
    config.validate()?;
    info!("{config}");

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let prober = build_prober(&config.probe).map_err(AppError::Prober)?;
    let monitor = Monitor::new(MonitorConfig::from(&config), prober.clone());

    let state = web::Data::new(AppState {
        monitor: monitor.clone(),
        prober,
        subscriptions: SubscriptionStore::new(&config.subscriptions.path),
    });

    log_transitions(monitor.subscribe_transitions());
    monitor.start();

    let result = run_server(addr, state).await;
    monitor.stop();
    result
}

/// Report confirmed status changes in operator-facing terms
fn log_transitions(mut transitions: broadcast::Receiver<StatusTransition>) {
    tokio::spawn(async move {
        loop {
            match transitions.recv().await {
                Ok(transition) => match (&transition.to, &transition.downtime) {
                    (ServiceStatus::Offline, _) => {
                        warn!(service = %transition.service_id, "service is down");
                    }
                    (_, Some(downtime)) => {
                        info!(
                            service = %transition.service_id,
                            status = %transition.to,
                            down_for = %format_duration(downtime.duration_sec),
                            "service recovered"
                        );
                    }
                    _ => {}
                },
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "status change log fell behind"),
                Err(RecvError::Closed) => break,
            }
        }
    });
}

async fn run_server(addr: SocketAddr, state: web::Data<AppState>) -> Result<(), AppError> {
    info!(%addr, "starting HTTP server");

    HttpServer::new(move || App::new().app_data(state.clone()).configure(routes::routes))
        .bind(addr)?
        .run()
        .await?;

    Ok(())
}
