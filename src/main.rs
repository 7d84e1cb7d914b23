mod config;
mod logs;
mod simulation;

use log::{error, info};
use ttt_server_domain::app::construct_in_memory_app;

use crate::{
    config::{LogConfig, SimulationConfig},
    logs::init_logger,
    simulation::{Simulation, leaderboard},
};

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received. Stopping simulation...");
}

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Failed to load .env file: {}", e);
        }
    }

    if let Err(e) = init_logger(&LogConfig::from_env()) {
        eprintln!("Failed to initialize logger: {}", e);
        std::process::exit(1);
    }

    let config = match SimulationConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let app = construct_in_memory_app();
    let simulation = match Simulation::setup(app.clone(), config) {
        Ok(simulation) => simulation,
        Err(e) => {
            error!("Failed to set up simulation: {}", e);
            std::process::exit(1);
        }
    };

    let report = simulation.run(shutdown_signal()).await;
    info!(
        "Done after {:.1}s: sent={} accepted={} games={}",
        report.elapsed.as_secs_f64(),
        report.sent,
        report.accepted,
        report.games_started
    );

    match leaderboard(&app) {
        Ok(page) => match serde_json::to_string_pretty(&page) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("Failed to serialize leaderboard: {}", e),
        },
        Err(e) => error!("Failed to load leaderboard: {}", e),
    }
}
