use std::sync::Arc;

use askdoc_core::embeddings::GeminiEmbeddingConfig;
use askdoc_core::generation::GeminiChatConfig;
use askdoc_core::index::VectorStore;
use askdoc_core::{
    AskdocConfig, GeminiChatClient, GeminiEmbeddingClient, PlainTextExtractor,
};
use clap::Parser;
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use askdoc_server::http::{self, AppState};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "askdoc.toml")]
    config: String,

    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience: production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Init logging
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    // Load config
    let config = match AskdocConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Connect to DB and ensure schema
    let pool = match askdoc_core::db::create_pool(&config.database).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };
    askdoc_core::db::init_schema(&pool).await?;

    if args.health {
        match askdoc_core::db::health_check(&pool).await {
            Ok(v) => println!("SQLite connected: {}", v),
            Err(e) => {
                println!("SQLite connection failed: {}", e);
                std::process::exit(1);
            }
        }
        println!("askdoc DB health check passed");
        return Ok(());
    }

    // External backends: both ride the same GOOGLE_API_KEY
    let embedder = GeminiEmbeddingClient::new(GeminiEmbeddingConfig::new(
        None,
        &config.embedding,
    ))?;
    let generator = GeminiChatClient::new(GeminiChatConfig::new(None, &config.generation))?;

    let state = Arc::new(AppState {
        pool,
        config,
        store: VectorStore::new(),
        extractor: Box::new(PlainTextExtractor),
        embedder: Box::new(embedder),
        generator: Box::new(generator),
    });

    // Shutdown signal
    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    http::start_http_server(state, tx.subscribe()).await?;

    Ok(())
}
