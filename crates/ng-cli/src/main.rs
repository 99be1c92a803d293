// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
//! Command-line entrypoint: derives the workspace key, routes between
//! becoming the primary instance and activating an existing one, and, when
//! primary, serves the activation channel until interrupted.

mod handler;

use anyhow::{Context, Result};
use clap::Parser;
use handler::{ActivationMessageHandler, StubIndexHandle, StubWindowHandle};
use ng_config::GalleryConfig;
use ng_index::StdFileReader;
use ng_router::{InstanceRouter, RouteDecision};
use ng_viewmodel::ViewModel;
use ng_workspace_key::WorkspaceKey;
use std::path::PathBuf;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// NextGallery backend core: per-workspace single-instance activation and
/// index serving.
#[derive(Parser, Debug)]
#[command(name = "nextgallery", version, about = "NextGallery backend core")]
struct Args {
    /// Workspace directory to open.
    #[arg(long)]
    workspace: PathBuf,

    /// View to navigate to; forwarded to an already-running instance.
    #[arg(long)]
    view: Option<String>,

    /// Path to a TOML config file overriding defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose logging.
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.debug {
        EnvFilter::new("ng=debug")
    } else {
        EnvFilter::new("ng=info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config =
        ng_config::load_config(args.config.as_deref()).context("loading configuration")?;
    ng_config::apply_env_overrides(&mut config);
    for warning in ng_config::validate_config(&config).context("validating configuration")? {
        tracing::warn!(%warning, "configuration warning");
    }

    let workspace_path = args
        .workspace
        .to_str()
        .context("workspace path is not valid UTF-8")?
        .to_string();
    let workspace_key =
        ng_workspace_key::compute_key(&workspace_path).context("resolving workspace key")?;

    let (decision, router) = InstanceRouter::route(
        &workspace_path,
        &workspace_key,
        args.view.clone(),
        config.transport_timeouts(),
    )
    .await;

    match decision {
        RouteDecision::ActivateExisting => {
            info!("an existing instance handled activation");
            Ok(())
        }
        RouteDecision::CreateWindow { degraded } => {
            if degraded {
                info!(
                    "becoming primary after a failed activation attempt against a suspected-orphaned mutex"
                );
            } else {
                info!("becoming primary instance");
            }
            run_primary(workspace_key, args.workspace, config, router).await
        }
    }
}

/// Runs as the primary instance: loads the index once, starts the
/// activation server, and blocks until interrupted.
async fn run_primary(
    workspace_key: WorkspaceKey,
    workspace_root: PathBuf,
    config: GalleryConfig,
    router: InstanceRouter,
) -> Result<()> {
    let mut viewmodel = ViewModel::new(
        StdFileReader,
        workspace_root,
        config.failure_backoff_threshold,
    );
    viewmodel.on_start();
    info!(
        suspended = viewmodel.is_suspended(),
        "initial index load complete"
    );

    let server = ng_transport::PipeTransportServer::new(workspace_key);
    let handler = ActivationMessageHandler::new(StubWindowHandle::default(), StubIndexHandle);
    let (cancel_tx, cancel_rx) = watch::channel(false);

    let serve_task = tokio::spawn(async move {
        if let Err(e) = server.serve(&handler, cancel_rx).await {
            tracing::error!(error = %e, "activation server stopped unexpectedly");
        }
    });

    tokio::signal::ctrl_c().await.context("waiting for shutdown signal")?;
    info!("shutting down");
    let _ = cancel_tx.send(true);
    let _ = serve_task.await;
    drop(router);
    Ok(())
}
