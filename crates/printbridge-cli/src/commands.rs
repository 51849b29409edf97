//! Subcommand implementations.
//!
//! These sequence the two libraries: the batch runs to completion first,
//! then any printing goes to the bridge.

use crate::render::Renderer;
use crate::settings::Settings;
use anyhow::{Context as _, bail};
use printbridge_batch::{BatchOrchestrator, BatchResult, HttpStateChange, NoActionsError};
use printbridge_client::{BridgeClient, BridgeHandlers};
use printbridge_core::labels::package_label_job;
use printbridge_core::{Action, ActionItem, ConnectionState, PrintJob};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Frames are written by the connection task; give it time to flush
/// before the process exits.
const LINGER: Duration = Duration::from_millis(300);

pub struct Context {
    settings: Settings,
    wait: Duration,
}

impl Context {
    pub fn new(settings: Settings, wait_secs: u64) -> Self {
        Self {
            settings,
            wait: Duration::from_secs(wait_secs),
        }
    }

    fn bridge(&self, handlers: BridgeHandlers) -> anyhow::Result<BridgeClient> {
        let handlers = handlers.on_unreachable(|endpoint, _| {
            eprintln!(
                "Could not connect to the printer at {endpoint}. \
                 Please verify that the WebApp Hardware Bridge is running."
            );
        });
        let client = BridgeClient::with_handlers(self.settings.bridge_config(), handlers);
        client
            .connect(&self.settings.bridge.endpoint)
            .with_context(|| format!("bridge endpoint {:?}", self.settings.bridge.endpoint))?;
        Ok(client)
    }

    /// Connect and block until the bridge is up or `wait` runs out.
    async fn connected_bridge(&self) -> anyhow::Result<BridgeClient> {
        let client = self.bridge(BridgeHandlers::new())?;
        let mut state = client.watch_state();
        match tokio::time::timeout(self.wait, state.wait_for(|s| s.is_connected())).await {
            Ok(Ok(_)) => Ok(client),
            Ok(Err(_)) => bail!("bridge connection task stopped"),
            Err(_) => bail!(
                "print bridge at {} not reachable within {:?}",
                self.settings.bridge.endpoint,
                self.wait
            ),
        }
    }

    fn renderer(&self) -> anyhow::Result<Renderer> {
        let remote = &self.settings.remote;
        let renderer = Renderer::new(
            &remote.base_url,
            &remote.render_method,
            &remote.print_format,
            self.settings.batch_config().call_timeout,
        )
        .context("building render client")?;
        Ok(renderer.with_token(remote.token.clone()))
    }

    fn state_change(&self) -> HttpStateChange {
        let remote = &self.settings.remote;
        let state_change = HttpStateChange::new(&remote.base_url, &remote.method);
        match &remote.token {
            Some(token) => state_change.with_token(token),
            None => state_change,
        }
    }
}

async fn send_and_close(client: BridgeClient, jobs: Vec<PrintJob>) {
    let frames: usize = jobs.iter().map(PrintJob::frame_count).sum();
    client.submit_all(jobs);
    tokio::time::sleep(LINGER).await;
    client.close();
    info!("Sent {} frame(s) to the print bridge", frames);
}

pub async fn print(ctx: &Context, file: &Path, kind: Option<String>) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;
    let kind = kind.unwrap_or_else(|| ctx.settings.print.invoice_printer.clone());
    let mut job = PrintJob::document_bytes(kind, &bytes);
    if let Some(name) = file.file_name() {
        job = job.with_file_name(name.to_string_lossy());
    }

    let client = ctx.connected_bridge().await?;
    send_and_close(client, vec![job]).await;
    println!("Sent {} to the printer", file.display());
    Ok(())
}

pub async fn labels(
    ctx: &Context,
    invoice: &str,
    packages: u32,
    kind: Option<String>,
) -> anyhow::Result<()> {
    let kind = kind.unwrap_or_else(|| ctx.settings.print.label_printer.clone());
    let job = package_label_job(kind, invoice, packages)?;

    let client = ctx.connected_bridge().await?;
    send_and_close(client, vec![job]).await;
    println!("Printed invoice {invoice} with {packages} package label(s)");
    Ok(())
}

pub async fn batch(
    ctx: &Context,
    action: Action,
    invoices: Vec<String>,
    print: bool,
) -> anyhow::Result<()> {
    let items: Vec<ActionItem> = invoices
        .into_iter()
        .map(|invoice| ActionItem::new(invoice, action))
        .collect();

    let orchestrator =
        BatchOrchestrator::with_config(ctx.state_change(), ctx.settings.batch_config());
    let result = match orchestrator.apply_batch(items).await {
        Ok(result) => result,
        Err(NoActionsError) => bail!("No actions selected: pass at least one invoice"),
    };

    report(&result);

    if print {
        if action == Action::Deliver && result.is_success() {
            // The actions are applied already; a print problem does not undo that.
            if let Err(e) = print_delivered(ctx, &result).await {
                warn!("Invoices were delivered but not printed: {:#}", e);
            }
        } else if action != Action::Deliver {
            warn!("--print only applies to deliver batches, ignoring");
        }
    }

    if !result.is_success() {
        bail!("{}", result.summary());
    }
    Ok(())
}

fn report(result: &BatchResult) {
    println!("{}", result.summary());
    for failure in result.failures() {
        println!("  {}: {}", failure.item, failure.error);
    }
}

async fn print_delivered(ctx: &Context, result: &BatchResult) -> anyhow::Result<()> {
    let renderer = ctx.renderer()?;
    let mut jobs = Vec::new();
    for item in result.applied_items() {
        match renderer.invoice_pdf(&item.record_id).await {
            Ok(pdf) => jobs.push(
                PrintJob::document(ctx.settings.print.invoice_printer.clone(), pdf)
                    .with_file_name(format!("{}.pdf", item.record_id)),
            ),
            Err(e) => warn!("Could not render {}: {}", item.record_id, e),
        }
    }
    if jobs.is_empty() {
        warn!("Nothing rendered, skipping print");
        return Ok(());
    }

    let count = jobs.len();
    let client = ctx.connected_bridge().await?;
    send_and_close(client, jobs).await;
    println!("Sent {count} invoice(s) to the printer");
    Ok(())
}

pub async fn watch(ctx: &Context) -> anyhow::Result<()> {
    let handlers = BridgeHandlers::new()
        .on_connect(|| info!("Bridge connected"))
        .on_disconnect(|| warn!("Bridge disconnected"))
        .on_message(|text| info!("Bridge: {}", text));
    let client = ctx.bridge(handlers)?;
    let mut state = client.watch_state();

    loop {
        tokio::select! {
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let now: ConnectionState = *state.borrow_and_update();
                tracing::debug!("Bridge state: {}", now);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, closing bridge connection");
                break;
            }
        }
    }

    client.close();
    Ok(())
}
