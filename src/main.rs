//! chat-relay: HTTP relay in front of a hosted chat completion API
//!
//! Serves a small chat API (plain and streaming turns, web search, image
//! generation) and forwards completions to an OpenAI-compatible provider.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use chat_relay::{
    api::Message,
    config::{AppConfig, Secrets},
    proxy::build_http_client,
    run_server,
    upstream::UpstreamClient,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Parser)]
#[command(name = "chat-relay")]
#[command(version = "0.1.0")]
#[command(about = "HTTP relay for hosted chat completion APIs")]
#[command(long_about = "
chat-relay serves a small chat API in front of an OpenAI-compatible
completion provider:
  - POST /chat and /chat-stream with optional web search context
  - POST /search and /generate-image
  - the static chat page from the configured directory

Secrets come from the environment (or a .env file):
  TOGETHER_API_KEY   required
  IMAGE_API_KEY      optional, enables /generate-image

Example usage:
  chat-relay run --port 8000
  chat-relay check-config --config config.yaml
")]
struct Cli {
    /// Path to config file (built-in defaults are used when it does not exist)
    #[arg(short, long, global = true, default_value = "config.yaml")]
    config: PathBuf,

    /// Set logging level (trace, debug, info, warn, error)
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<LogLevel>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay server
    Run {
        /// Override listen port
        #[arg(short, long)]
        port: Option<u16>,
        /// Override completion provider URL (e.g., "http://localhost:8080")
        #[arg(long)]
        upstream_url: Option<String>,
    },

    /// Validate configuration file and environment
    CheckConfig,

    /// Send a one-line completion to the provider and print the reply
    TestUpstream,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; the variables may already be exported
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let level_filter = if let Some(level) = cli.log_level {
        level.to_string()
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
            .to_string()
    };
    let filter = tracing_subscriber::EnvFilter::new(&level_filter);

    match cli.log_format {
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
    }

    match cli.command {
        Commands::Run { port, upstream_url } => {
            run_relay(&cli.config, port, upstream_url).await?;
        }
        Commands::CheckConfig => {
            check_config(&cli.config)?;
        }
        Commands::TestUpstream => {
            test_upstream(&cli.config).await?;
        }
    }

    Ok(())
}

/// Run the relay server
async fn run_relay(config_path: &Path, port_override: Option<u16>, upstream_url_override: Option<String>) -> anyhow::Result<()> {
    let mut config = AppConfig::load_or_default(config_path)
        .with_context(|| format!("loading configuration from {:?}", config_path))?;

    if let Some(port) = port_override {
        config.server.port = port;
    }
    if let Some(url) = upstream_url_override {
        config.upstream.url = url;
        config.validate()?;
    }

    let secrets = Secrets::from_env()?;

    tracing::info!(
        model = %config.upstream.model,
        static_dir = %config.server.static_dir,
        search = %config.search.url,
        "Configuration loaded"
    );

    run_server(config, secrets).await
}

/// Validate configuration file and secrets
fn check_config(config_path: &Path) -> anyhow::Result<()> {
    let config = match AppConfig::load_or_default(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    println!("✓ Configuration is valid\n");
    println!("Server:");
    println!("  Listen: {}:{}", config.server.host, config.server.port);
    println!("  Static: {}", config.server.static_dir);
    println!("\nUpstream:");
    println!("  URL: {}", config.upstream.completions_url());
    println!("  Model: {}", config.upstream.model);
    println!("  Temperature: {}", config.upstream.temperature);
    println!("  Max tokens: {}", config.upstream.max_tokens);
    match config.upstream.timeout_seconds {
        Some(secs) => println!("  Timeout: {}s (non-streaming)", secs),
        None => println!("  Timeout: none"),
    }
    println!("\nSearch:");
    println!("  URL: {}", config.search.url);
    println!("  Results per chat turn: {}", config.search.chat_max_results);
    println!("\nImage:");
    println!("  URL: {}", config.image.url);

    println!("\nSecrets:");
    match Secrets::from_env() {
        Ok(secrets) => {
            println!("  TOGETHER_API_KEY: set");
            println!(
                "  IMAGE_API_KEY: {}",
                if secrets.image_api_key.is_some() { "set" } else { "not set" }
            );
        }
        Err(e) => {
            eprintln!("✗ {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Send a tiny non-streaming completion to check key, URL and model
async fn test_upstream(config_path: &Path) -> anyhow::Result<()> {
    let config = AppConfig::load_or_default(config_path)?;
    let secrets = Secrets::from_env()?;

    let client = UpstreamClient::new(build_http_client()?, config.upstream.clone(), secrets.completion_api_key);

    println!("Testing completion provider: {}", config.upstream.completions_url());
    println!("  Model: {}", config.upstream.model);

    let messages = vec![
        Message::system(config.upstream.default_system_prompt.clone()),
        Message::user("Reply with the single word: pong"),
    ];

    match client.complete(messages, None, None).await {
        Ok(reply) => {
            println!("✓ Provider is reachable");
            println!("  Reply: {}", reply.trim());
            Ok(())
        }
        Err(e) => {
            println!("✗ Provider request failed: {}", e);
            std::process::exit(1);
        }
    }
}
