//! chat-relay e2e tests
//!
//! Starts the mock providers, spawns the relay against them with test keys,
//! runs every case and exits non-zero on any failure.
//!
//!   cargo run                              # auto-detect the relay binary, run all cases
//!   cargo run -- --filter stream/          # only cases whose name contains "stream/"
//!   cargo run -- --relay-bin path/to/bin   # explicit binary
//!   cargo run -- list                      # list cases

mod backend;
mod client;
mod relay;
mod suite;
mod tests;
mod types;

use clap::{Parser, Subcommand};
use colored::Colorize;

use relay::RelayProcess;
use suite::{Suite, TestContext};

/// Mock provider port; test_configs/relay.yaml points the relay here
const MOCK_PROVIDER_PORT: u16 = 18080;

#[derive(Parser)]
#[command(name = "e2e", about = "End-to-end tests for chat-relay")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Only run cases whose name contains this string
    #[arg(long, short)]
    filter: Option<String>,

    /// Path to the chat-relay binary (default: ../target/{release,debug}/chat-relay)
    #[arg(long)]
    relay_bin: Option<String>,

    /// Relay config; its provider URLs must point at the mock port
    #[arg(long, default_value = "test_configs/relay.yaml")]
    relay_config: String,

    /// Port the relay listens on, as set in the relay config
    #[arg(long, default_value_t = 18066)]
    relay_port: u16,
}

#[derive(Subcommand)]
enum Command {
    /// List all cases
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let suite = Suite::new(tests::all_tests());

    if let Some(Command::List) = cli.command {
        suite.list();
        return Ok(());
    }

    let relay_bin = relay::find_relay_bin(cli.relay_bin)?;
    let backend_state = backend::start(MOCK_PROVIDER_PORT).await?;
    println!("Mock providers on 127.0.0.1:{}", MOCK_PROVIDER_PORT);

    let http_client = client::build_client();
    println!("Spawning {} run --config {}", relay_bin.bright_cyan(), cli.relay_config);
    let relay = RelayProcess::spawn(&relay_bin, &cli.relay_config, cli.relay_port, &http_client).await?;

    let ctx = TestContext {
        relay_addr: relay.addr().to_string(),
        backend_state,
        http_client,
    };
    let results = suite.run(&ctx, cli.filter.as_deref()).await;
    relay.stop().await;

    if results.iter().any(|r| !r.passed()) {
        std::process::exit(1);
    }
    Ok(())
}
