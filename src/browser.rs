//! Headless browser session management for JS-rendered search pages.
//!
//! The portal's search result pages populate their listing grid from
//! JavaScript, so plain HTTP fetches see an empty shell. This module drives a
//! real browser through the WebDriver protocol: it spawns a `geckodriver`
//! process on a random port, connects a [`fantoccini`] client to it, and
//! hands back rendered page source.
//!
//! Detail pages don't need any of this; they are served fully rendered and go
//! through [`crate::fetch`] instead.

use std::error::Error;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use fantoccini::{Client, ClientBuilder};
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use crate::config::USER_AGENTS;

/// A live WebDriver browser session.
///
/// Owns the spawned driver process (when one was spawned) and the client
/// connected to it. Call [`BrowserSession::shutdown`] when done; dropping
/// without it leaves the session to the driver's own cleanup.
pub struct BrowserSession {
    driver_process: Option<Child>,
    client: Client,
}

fn random_port() -> u16 {
    rand::random::<u16>() % (65535 - 1024) + 1024
}

fn spawn_geckodriver(port: u16) -> Result<Child, Box<dyn Error>> {
    Command::new("geckodriver")
        .arg("--port")
        .arg(port.to_string())
        .arg("--log")
        .arg("fatal")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| format!("failed to start geckodriver: {e}").into())
}

async fn connect_client(webdriver_url: &str) -> Result<Client, Box<dyn Error>> {
    // The driver process needs a moment to bind its port.
    let mut last_err = None;
    for attempt in 0..10 {
        match ClientBuilder::native().connect(webdriver_url).await {
            Ok(client) => {
                client.set_ua(USER_AGENTS[0]).await?;
                return Ok(client);
            }
            Err(e) => {
                debug!(attempt, error = %e, "WebDriver not ready yet");
                last_err = Some(e);
                sleep(Duration::from_millis(300)).await;
            }
        }
    }
    Err(format!(
        "failed to connect to WebDriver at {webdriver_url}: {}",
        last_err.map(|e| e.to_string()).unwrap_or_default()
    )
    .into())
}

impl BrowserSession {
    /// Spawn a local `geckodriver` and connect to it.
    #[instrument(level = "info")]
    pub async fn spawn() -> Result<Self, Box<dyn Error>> {
        let port = random_port();
        let process = spawn_geckodriver(port)?;
        let client = connect_client(&format!("http://localhost:{port}")).await?;
        info!(port, "Browser session started");
        Ok(BrowserSession {
            driver_process: Some(process),
            client,
        })
    }

    /// Attach to an already-running WebDriver server instead of spawning one.
    #[instrument(level = "info", skip_all, fields(%webdriver_url))]
    pub async fn connect(webdriver_url: &str) -> Result<Self, Box<dyn Error>> {
        let client = connect_client(webdriver_url).await?;
        info!("Attached to external WebDriver");
        Ok(BrowserSession {
            driver_process: None,
            client,
        })
    }

    /// Navigate to `url`, wait `settle` for client-side rendering, and return
    /// the rendered page source.
    #[instrument(level = "info", skip_all, fields(%url))]
    pub async fn page_source(&self, url: &str, settle: Duration) -> Result<String, Box<dyn Error>> {
        self.client.goto(url).await?;
        sleep(settle).await;
        let html = self.client.source().await?;
        debug!(bytes = html.len(), "Captured rendered page source");
        Ok(html)
    }

    /// Close the WebDriver session and kill the spawned driver process.
    #[instrument(level = "info", skip_all)]
    pub async fn shutdown(mut self) {
        if let Err(e) = self.client.clone().close().await {
            warn!(error = %e, "Failed to close WebDriver client");
        }
        if let Some(mut process) = self.driver_process.take() {
            if let Err(e) = process.kill() {
                warn!(error = %e, "Failed to kill geckodriver process");
            }
        }
        info!("Browser session closed");
    }
}
