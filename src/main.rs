use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::sync::Arc;

mod agents;
mod ai;
mod config;
mod controllers;
mod db;
mod http;
mod runtime;
mod stores;
mod tools;

use agents::PromptRunner;
use config::Config;
use db::Database;
use runtime::AgentMode;

pub struct AppState {
    pub config: Config,
    pub mode: AgentMode,
    pub runner: Arc<dyn PromptRunner>,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env();
    let port = config.port;

    log::info!("Initializing database at {}", config.database_url);
    let db = Database::new(&config.database_url).expect("Failed to initialize database");
    let db = Arc::new(db);

    let (runner, mode) =
        runtime::build_runner(&config, db).expect("Failed to build agent runner");

    // One-shot CLI path: `relay-agent "What's the weather in Tokyo?"`
    let args: Vec<String> = std::env::args().skip(1).collect();
    if !args.is_empty() {
        let prompt = args.join(" ");
        log::info!("CLI run started: mode={}", mode.as_str());
        match runner.run(&prompt).await {
            Ok(outcome) => {
                if outcome.is_degraded() {
                    log::warn!("CLI run degraded: turn budget exhausted");
                }
                println!("{}", outcome.response);
                return Ok(());
            }
            Err(e) => {
                eprintln!("Agent execution failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    let state = web::Data::new(AppState {
        config,
        mode,
        runner,
    });

    log::info!(
        "Starting server on port {} (mode={}, version={})",
        port,
        mode.as_str(),
        controllers::health::VERSION
    );

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(controllers::health::config)
            .configure(controllers::chat::config)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
