use anyhow::{Context, Result};
use clap::Parser;
use scribe_dictation::{
    create_router, AllowAll, AppState, Assembler, Config, PartSpool, RemoteStt, SessionStore,
    SpeechToText,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scribe-dictation")]
#[command(about = "Chunked dictation capture and ordered transcription service")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// Config file path (without extension)
    #[arg(long, default_value = "config/scribe-dictation")]
    config: String,

    /// Override the configured bind address
    #[arg(long)]
    bind: Option<String>,

    /// Override the configured port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut cfg = Config::load(&args.config)?;
    if let Some(bind) = args.bind {
        cfg.service.http.bind = bind;
    }
    if let Some(port) = args.port {
        cfg.service.http.port = port;
    }

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("Spool directory: {}", cfg.session.spool_dir.display());

    let stt = Arc::new(RemoteStt::new(cfg.transcription.clone())?);
    if stt.is_available().await {
        info!("Transcription endpoint: {}", cfg.transcription.endpoint);
    } else {
        warn!("No transcription endpoint configured; finalize will fail until one is set");
    }

    let store = SessionStore::new(
        PartSpool::new(&cfg.session.spool_dir),
        cfg.session.limits(),
        Arc::new(AllowAll),
        Assembler::new(
            stt,
            cfg.transcription.max_concurrent,
            cfg.transcription.language.clone(),
        ),
    );

    let router = create_router(AppState::new(store));

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}
