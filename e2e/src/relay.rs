//! The relay under test, run as a child process
//!
//! The relay reads its provider keys from the environment, so the harness
//! hands it fixed test keys and the mocks check that they come back as
//! bearer tokens.

use std::path::Path;
use std::time::Duration;
use tokio::process::{Child, Command};

/// Build outputs tried in order when no `--relay-bin` is given
const RELAY_BIN_CANDIDATES: &[&str] = &["../target/release/chat-relay", "../target/debug/chat-relay"];

/// Keys handed to the spawned relay; the mocks only check they are forwarded
pub const TEST_COMPLETION_KEY: &str = "e2e-completion-key";
pub const TEST_IMAGE_KEY: &str = "e2e-image-key";

/// A running relay. Dropping it kills the process.
pub struct RelayProcess {
    child: Child,
    addr: String,
}

impl RelayProcess {
    /// Spawn `run --config <config>` and wait until `/health` answers on `port`
    pub async fn spawn(bin: &str, config: &str, port: u16, client: &reqwest::Client) -> anyhow::Result<Self> {
        let child = Command::new(bin)
            .args(["run", "--config", config])
            .env("TOGETHER_API_KEY", TEST_COMPLETION_KEY)
            .env("IMAGE_API_KEY", TEST_IMAGE_KEY)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| anyhow::anyhow!("Failed to spawn '{}': {}", bin, e))?;

        let mut relay = Self {
            child,
            addr: format!("127.0.0.1:{}", port),
        };
        relay.wait_healthy(client).await?;
        Ok(relay)
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn wait_healthy(&mut self, client: &reqwest::Client) -> anyhow::Result<()> {
        let health_url = format!("http://{}/health", self.addr);

        for attempt in 0..30u64 {
            tokio::time::sleep(Duration::from_millis(200 + attempt * 100)).await;

            // A relay that exits during startup (bad config, port taken) will never answer
            if let Some(status) = self.child.try_wait()? {
                anyhow::bail!("Relay exited during startup with {}", status);
            }

            if let Ok(resp) = client.get(&health_url).send().await {
                if resp.status().is_success() {
                    return Ok(());
                }
            }
        }

        anyhow::bail!("Relay did not answer {} in time", health_url)
    }

    pub async fn stop(mut self) {
        self.child.kill().await.ok();
    }
}

/// Locate the relay binary: explicit path first, then the workspace build outputs
pub fn find_relay_bin(explicit: Option<String>) -> anyhow::Result<String> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    RELAY_BIN_CANDIDATES
        .iter()
        .find(|candidate| Path::new(candidate).exists())
        .map(|candidate| candidate.to_string())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "No relay binary found. Tried: {}\nBuild with: cd .. && cargo build --release",
                RELAY_BIN_CANDIDATES.join(", ")
            )
        })
}
