use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;

use policy_rag::{config::Config, create_router, utils::init_logger, AppState, RagEngine};

#[derive(Parser)]
#[command(name = "policy-rag", version, about = "Chat with your home insurance policy")]
struct Cli {
    /// Policy document to index (overrides POLICY_DOCUMENT_PATH)
    #[arg(long, global = true)]
    document: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the chat web UI (default)
    Serve {
        /// Port to listen on (overrides PORT)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Answer a single question and exit
    Ask {
        question: String,

        /// Number of pages to retrieve (overrides RAG_TOP_K)
        #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
        top_k: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    let _log_guard = init_logger(config.logging.log_dir.as_deref());

    if let Some(document) = cli.document {
        config.document.path = document;
    }

    if config.llm.api_key().is_none() {
        anyhow::bail!("API key not found. Please check your .env file (GEMINI_API_KEY)");
    }

    match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(config).await
        }
        Command::Ask { question, top_k } => {
            if let Some(top_k) = top_k {
                config.retrieval.top_k = top_k;
            }
            let engine = build_engine(config).await?;
            let answer = engine.ask(&question).await?;
            info!(source = ?answer.source, "Answered");
            println!("{}", answer.content);
            Ok(())
        }
    }
}

async fn build_engine(config: Config) -> anyhow::Result<RagEngine> {
    info!(document = %config.document.path.display(), "Loading policy documents...");
    // Embedding every page is CPU-bound
    let engine = tokio::task::spawn_blocking(move || RagEngine::from_config(&config))
        .await
        .map_err(|e| anyhow::anyhow!("Index build task failed: {}", e))??;
    Ok(engine)
}

async fn serve(config: Config) -> anyhow::Result<()> {
    info!("Configuration loaded: {:?}", config.server);

    let engine = build_engine(config.clone()).await?;
    let state = AppState::new(engine);
    let app = create_router(state, &config.server.cors_allowed_origins);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid listen address: {}", e))?;
    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
