//! arxiv-digest - Daily arXiv digest ranked by an LLM
//!
//! Fetches today's new submissions for a topic, keeps the requested subjects,
//! scores them against a research interest and writes the best matches.
//!
//! ## Usage
//!
//! ### CLI Mode
//! ```bash
//! arxiv-digest digest "Computer Science" "machine learning, robotics" "legged locomotion" --max-results 5
//! ```
//!
//! ### HTTP Server Mode
//! ```bash
//! arxiv-digest serve --port 3000
//! ```

use anyhow::{Context, Result};
use arxiv_digest::{
    digest::{self, DigestPipeline, DigestRequest, OutputFormat},
    listing::{ListingClient, ListingConfig, DEFAULT_ARXIV_URL},
    llm::{InferenceProvider, LlmConfig, OpenAiCompatibleClient, ProviderChoice},
    prompts::PromptTemplate,
    ranker::{RankerConfig, DEFAULT_BATCH_SIZE},
    settings::{mask_key, SettingsStore},
    DigestEntry,
};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Daily arXiv digest ranked by an LLM
#[derive(Parser)]
#[command(name = "arxiv-digest")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank today's new submissions and write the results
    Digest {
        /// Topic label (e.g., "Computer Science", "Quantum Physics")
        topic: String,

        /// Comma-separated subjects (e.g., "machine learning, robotics")
        subjects: String,

        /// Free-text research interest
        interest: String,

        /// Maximum number of results (capped at 10)
        #[arg(long, default_value = "10")]
        max_results: usize,

        /// Output file
        #[arg(short, long, default_value = "results.json")]
        output: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "json")]
        format: FormatArg,

        /// arXiv mirror URL
        #[arg(long, default_value = DEFAULT_ARXIV_URL)]
        listing_url: String,

        #[command(flatten)]
        llm: LlmArgs,
    },

    /// Run as HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// arXiv mirror URL
        #[arg(long, default_value = DEFAULT_ARXIV_URL)]
        listing_url: String,

        #[command(flatten)]
        llm: LlmArgs,
    },

    /// Manage the stored API key
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
}

#[derive(Subcommand)]
enum KeyAction {
    /// Store an API key
    Set {
        key: String,

        /// Provider the key belongs to
        #[arg(long, value_enum)]
        provider: Option<ProviderArg>,
    },
    /// Show the stored key (masked)
    Show,
    /// Remove stored settings
    Clear,
    /// Show settings file path
    Path,
}

/// LLM and ranking options shared by `digest` and `serve`
#[derive(Args)]
struct LlmArgs {
    /// Inference API key (falls back to the stored key)
    #[arg(long, env = "ARXIV_DIGEST_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Inference provider; `auto` guesses from the key
    #[arg(long, value_enum)]
    provider: Option<ProviderArg>,

    /// Model name (defaults to the provider's model)
    #[arg(long)]
    model: Option<String>,

    /// OpenAI-compatible API base URL override (e.g., http://localhost:8080/v1)
    #[arg(long)]
    llm_base_url: Option<String>,

    /// Papers per prompt
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Minimum relevancy score kept
    #[arg(long, default_value = "0")]
    threshold: i64,

    /// Sampling temperature
    #[arg(long, default_value = "0.4")]
    temperature: f32,

    /// Nucleus sampling
    #[arg(long, default_value = "1.0")]
    top_p: f32,

    /// Batches sent concurrently
    #[arg(long, default_value = "1")]
    concurrency: usize,

    /// Per-request timeout; a timed-out batch scores nothing
    #[arg(long, default_value = "60")]
    timeout_secs: u64,

    /// Override the built-in relevancy instructions
    #[arg(long)]
    prompt_file: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ProviderArg {
    Openai,
    Sambanova,
    Auto,
}

impl From<ProviderArg> for ProviderChoice {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Openai => ProviderChoice::Explicit(InferenceProvider::OpenAi),
            ProviderArg::Sambanova => ProviderChoice::Explicit(InferenceProvider::SambaNova),
            ProviderArg::Auto => ProviderChoice::Auto,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Json,
    Csv,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Csv => OutputFormat::Csv,
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .init();

    match cli.command {
        Commands::Digest {
            topic,
            subjects,
            interest,
            max_results,
            output,
            format,
            listing_url,
            llm,
        } => {
            let request = DigestRequest {
                topic,
                subjects,
                interest,
                max_results,
            };
            run_digest(request, output, format.into(), listing_url, llm).await
        }
        Commands::Serve {
            port,
            host,
            listing_url,
            llm,
        } => run_server(host, port, listing_url, llm).await,
        Commands::Key { action } => handle_key(action),
    }
}

// ============================================================================
// Digest Pipeline
// ============================================================================

fn build_pipeline(listing_url: String, args: LlmArgs) -> Result<DigestPipeline<OpenAiCompatibleClient>> {
    let stored = SettingsStore::default().load();

    let api_key = args
        .api_key
        .or(stored.api_key)
        .context("No API key: pass --api-key, set ARXIV_DIGEST_API_KEY, or run `arxiv-digest key set`")?;

    let choice = match (args.provider, stored.provider) {
        (Some(arg), _) => arg.into(),
        (None, Some(provider)) => ProviderChoice::Explicit(provider),
        (None, None) => ProviderChoice::Explicit(InferenceProvider::OpenAi),
    };
    let provider = choice.resolve(&api_key);

    let mut llm_config = LlmConfig::new(provider, api_key);
    llm_config.model = args.model;
    llm_config.base_url = args.llm_base_url;
    llm_config.timeout = Duration::from_secs(args.timeout_secs);

    info!(
        provider = %provider,
        model = %llm_config.model(),
        base_url = %llm_config.base_url(),
        "Using inference provider"
    );

    let mut ranker = RankerConfig::new(llm_config.model());
    ranker.batch_size = args.batch_size;
    ranker.threshold = args.threshold;
    ranker.temperature = args.temperature;
    ranker.top_p = args.top_p;
    ranker.concurrency = args.concurrency;

    let listing = ListingClient::new(ListingConfig {
        base_url: listing_url,
        ..Default::default()
    })?;
    let client = OpenAiCompatibleClient::new(&llm_config)?;
    let template = PromptTemplate::load(args.prompt_file.as_deref());

    Ok(DigestPipeline::new(listing, client, template, ranker))
}

async fn run_digest(
    request: DigestRequest,
    output: PathBuf,
    format: OutputFormat,
    listing_url: String,
    llm: LlmArgs,
) -> Result<()> {
    let pipeline = build_pipeline(listing_url, llm)?;

    let results = pipeline.run(&request).await.context("Ranking failed")?;

    if results.is_empty() {
        println!("No matching papers today.");
    } else {
        println!("\n--- Top {} papers ---", results.len());
        for (idx, entry) in results.iter().enumerate() {
            println!(
                "{}. [{}] {}\n   {}",
                idx + 1,
                entry.relevancy_score.unwrap_or(0),
                entry.title,
                entry.url
            );
        }
    }

    digest::save_results(&output, &results, format)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Saved: {:?}", output);
    Ok(())
}

// ============================================================================
// HTTP Server
// ============================================================================

async fn run_server(host: String, port: u16, listing_url: String, llm: LlmArgs) -> Result<()> {
    info!(host = %host, port = port, "Starting HTTP server");

    let app_state = Arc::new(AppState {
        pipeline: build_pipeline(listing_url, llm)?,
    });

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/digest", post(digest_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("Invalid host:port")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}

struct AppState {
    pipeline: DigestPipeline<OpenAiCompatibleClient>,
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "OK"
}

/// Digest response
#[derive(Debug, Serialize)]
struct DigestResponse {
    status: String,
    count: usize,
    generated_at: String,
    results: Vec<DigestEntry>,
}

/// Digest endpoint handler
async fn digest_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DigestRequest>,
) -> Json<DigestResponse> {
    info!(topic = %req.topic, subjects = %req.subjects, "Digest request");

    let generated_at = Local::now().to_rfc3339();
    match state.pipeline.run(&req).await {
        Ok(results) => Json(DigestResponse {
            status: "success".to_string(),
            count: results.len(),
            generated_at,
            results,
        }),
        Err(e) => {
            error!(error = %e, "Digest failed");
            Json(DigestResponse {
                status: format!("error: {}", e),
                count: 0,
                generated_at,
                results: vec![],
            })
        }
    }
}

// ============================================================================
// Key Management
// ============================================================================

fn handle_key(action: KeyAction) -> Result<()> {
    let store = SettingsStore::new()?;

    match action {
        KeyAction::Set { key, provider } => {
            let provider = provider.and_then(|p| match ProviderChoice::from(p) {
                ProviderChoice::Explicit(provider) => Some(provider),
                ProviderChoice::Auto => None,
            });
            store.save_api_key(&key, provider)?;
            println!("API key saved.");
        }
        KeyAction::Show => {
            let settings = store.load();
            match settings.api_key {
                Some(key) => println!("API key: {}", mask_key(&key)),
                None => println!("No API key stored."),
            }
            if let Some(provider) = settings.provider {
                println!("Provider: {}", provider);
            }
        }
        KeyAction::Clear => {
            store.clear()?;
            println!("Settings cleared.");
        }
        KeyAction::Path => {
            println!("Settings file: {:?}", store.path());
        }
    }

    Ok(())
}
