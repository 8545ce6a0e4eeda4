use std::path::PathBuf;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use parasite_detector::{configure, load_classifier, AppState, Config};

/// Parasite detector: upload an image, get a classification.
#[derive(Parser)]
#[command(name = "parasite-detector")]
#[command(version)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind to, overrides the config file.
    #[arg(short, long, env = "DETECTOR_BIND")]
    bind: Option<String>,

    /// Skip the model and always simulate.
    #[arg(long)]
    simulate: bool,
}

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.server.address = bind;
    }

    let (classifier, status) = load_classifier(&config, args.simulate)?;
    let state = web::Data::new(AppState::new(
        classifier,
        status,
        config.server.max_upload_bytes,
    ));

    info!(address = %config.server.address, mode = ?state.status.mode, "server starting");

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header();

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .configure(configure)
    })
    .bind(&config.server.address)?
    .run()
    .await?;

    Ok(())
}
