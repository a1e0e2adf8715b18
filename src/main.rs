use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use kndu_k8s::{KubeClient, NodeFetcher};
use kndu_poll::{
    PollMode, PollScheduler, StatusMessage, StatusPrinter, StopReason, spawn_error_sink,
};
use kndu_render::TableRenderer;

mod config;
mod logging;

use config::{Args, Config};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    // Bad flags fail here, before logging or any cluster access
    let config = Config::from_args(args)?;
    logging::init(config.verbosity);

    let client = KubeClient::connect(&config.connect)
        .await
        .context("failed to load cluster credentials")?;
    let namespace = config.resolve_namespace(client.default_namespace());

    report_setup(&client, &namespace, config.show_conditions).await?;

    let stop = CancellationToken::new();
    let (error_tx, error_rx) = mpsc::channel(8);
    let sink = spawn_error_sink(error_rx, stop.clone());

    tokio::spawn({
        let stop = stop.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::debug!("interrupt received");
                stop.cancel();
            }
        }
    });

    let renderer = TableRenderer::stdout(config.mode == PollMode::Watch);
    let mut scheduler =
        PollScheduler::new(client, renderer, namespace, config.options, config.mode);

    // The scheduler owns the only error sender; the sink finishes when it returns
    let outcome = tokio::spawn(async move { scheduler.run(stop, error_tx).await })
        .await
        .context("poll task failed")?;

    if let Some(err) = sink.await.context("error sink task failed")? {
        return Err(err.into());
    }
    if outcome.reason == StopReason::Failed {
        anyhow::bail!("polling stopped after an error");
    }

    tracing::info!(cycles = outcome.cycles, reason = ?outcome.reason, "finished");
    Ok(())
}

/// Print the context and namespace found during setup, and the node
/// conditions when asked for
async fn report_setup(client: &KubeClient, namespace: &str, conditions: bool) -> Result<()> {
    let status = StatusPrinter::spawn(io::stdout());

    if let Some(context) = client.context() {
        status
            .send(StatusMessage::UsingContext(context.to_string()))
            .await;
    }
    if !namespace.is_empty() {
        status
            .send(StatusMessage::FoundNamespace(namespace.to_string()))
            .await;
    }

    let nodes = if conditions {
        client.fetch(namespace).await
    } else {
        Ok(Vec::new())
    };
    let nodes = match nodes {
        Ok(nodes) => nodes,
        Err(err) => {
            status.finish().await;
            return Err(err).context("failed to read node conditions");
        }
    };
    for node in &nodes {
        status.send(StatusMessage::node_conditions(node)).await;
    }

    status.finish().await;
    Ok(())
}
