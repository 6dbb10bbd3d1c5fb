//! # sam-exporter
//!
//! Sigma Air Manager exporter binary. It wires settings, telemetry, the
//! supervised controller pipeline and the HTTP surface together.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use sam_auth::Authenticator;
use sam_core::ControllerEndpoint;
use sam_server::AppState;
use sam_settings::SamSettings;
use sam_store::ValueStore;
use sam_transport::{ControllerPipeline, Supervisor, SupervisorExit};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Prometheus exporter for a Sigma Air Manager controller.
#[derive(Parser, Debug)]
#[command(name = "sam-exporter", about = "Sigma Air Manager Prometheus exporter")]
struct Cli {
    /// Settings file (defaults to `~/.sam-exporter/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host to bind (overrides settings).
    #[arg(long)]
    listen_host: Option<String>,

    /// Port to bind (overrides settings).
    #[arg(long)]
    listen_port: Option<u16>,
}

impl Cli {
    fn load_settings(&self) -> Result<SamSettings> {
        let path = self.config.clone().unwrap_or_else(sam_settings::settings_path);
        let mut settings = sam_settings::load_settings_from_path(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;
        if let Some(host) = &self.listen_host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.listen_port {
            settings.server.port = port;
        }
        settings.validate().context("Invalid settings")?;
        Ok(settings)
    }
}

/// Wait for `shutdown`, logging how supervision ended if it ends first.
///
/// The HTTP surface keeps serving the last known values after the pipeline
/// stops, so only `shutdown` ends the process.
async fn wait_for_shutdown<F, S>(
    supervisor: &mut JoinHandle<SupervisorExit>,
    shutdown: F,
) -> Result<()>
where
    F: Fn() -> S,
    S: Future<Output = std::io::Result<()>>,
{
    tokio::select! {
        signal = shutdown() => {
            signal.context("Failed to listen for ctrl-c")?;
        }
        exit = &mut *supervisor => {
            match exit.context("Supervisor task panicked")? {
                SupervisorExit::Fatal(error) => {
                    tracing::error!(%error, kind = error.error_kind(), "pipeline stopped; serving the last known values");
                }
                SupervisorExit::Closed => {
                    tracing::warn!("controller closed the connection; serving the last known values");
                }
                SupervisorExit::Cancelled => {}
            }
            shutdown().await.context("Failed to listen for ctrl-c")?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let settings = args.load_settings()?;

    sam_telemetry::init_telemetry(&settings.logging);
    let prometheus =
        sam_telemetry::metrics::install_recorder().context("Failed to install metrics recorder")?;

    let store = ValueStore::new();
    let cancel = CancellationToken::new();

    let endpoint = ControllerEndpoint::new(
        settings.controller.host.clone(),
        settings.controller.port,
    );
    let auth = Authenticator::new(
        endpoint,
        settings.controller.user.clone(),
        settings.controller.password.clone(),
    )
    .context("Failed to build HTTP client")?;
    let mut supervisor = Supervisor::new(ControllerPipeline::new(auth, store.clone()));
    let mut supervisor_handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move { supervisor.run(cancel).await })
    };

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    let server_handle = tokio::spawn(sam_server::serve(
        listener,
        AppState::new(store, prometheus),
        cancel.clone(),
    ));

    tracing::info!(
        controller = %settings.controller.host,
        port = settings.controller.port,
        "exporter started"
    );

    wait_for_shutdown(&mut supervisor_handle, tokio::signal::ctrl_c).await?;

    tracing::info!("Shutting down...");
    cancel.cancel();
    if !supervisor_handle.is_finished() {
        let _ = supervisor_handle.await;
    }
    server_handle
        .await
        .context("Server task panicked")?
        .context("HTTP server failed")?;

    tracing::info!("Shutdown complete");
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::Notify;

    use super::*;

    fn settings_file(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn cli_defaults_to_no_overrides() {
        let cli = Cli::parse_from(["sam-exporter"]);
        assert!(cli.config.is_none());
        assert!(cli.listen_host.is_none());
        assert!(cli.listen_port.is_none());
    }

    #[test]
    fn cli_overrides_listener() {
        let file = settings_file(r#"{"controller":{"host":"10.0.0.5"}}"#);
        let cli = Cli::parse_from([
            "sam-exporter",
            "--config",
            file.path().to_str().unwrap(),
            "--listen-host",
            "127.0.0.1",
            "--listen-port",
            "9100",
        ]);
        let settings = cli.load_settings().unwrap();
        assert_eq!(settings.controller.host, "10.0.0.5");
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 9100);
    }

    #[test]
    fn invalid_controller_host_is_rejected() {
        let file = settings_file(r#"{"controller":{"host":"not a host"}}"#);
        let cli = Cli::parse_from(["sam-exporter", "--config", file.path().to_str().unwrap()]);
        assert!(cli.load_settings().is_err());
    }

    #[tokio::test]
    async fn fatal_pipeline_exit_waits_for_shutdown() {
        let mut supervisor = tokio::spawn(async {
            SupervisorExit::Fatal(sam_auth::AuthError::UnexpectedStatus { status: 500 }.into())
        });
        let shutdown = Arc::new(Notify::new());
        let signal = {
            let shutdown = Arc::clone(&shutdown);
            move || {
                let shutdown = Arc::clone(&shutdown);
                async move {
                    shutdown.notified().await;
                    Ok(())
                }
            }
        };

        {
            let wait = wait_for_shutdown(&mut supervisor, signal);
            tokio::pin!(wait);
            let early = tokio::time::timeout(Duration::from_millis(100), &mut wait).await;
            assert!(early.is_err(), "returned before shutdown");

            shutdown.notify_one();
            wait.await.unwrap();
        }
        assert!(supervisor.is_finished());
    }

    #[test]
    fn cli_rejects_out_of_range_port() {
        assert!(Cli::try_parse_from(["sam-exporter", "--listen-port", "70000"]).is_err());
    }
}
