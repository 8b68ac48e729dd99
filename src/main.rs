use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use dupgrid::scanner::FolderEngine;
use dupgrid::{GridConfig, GroupTable};

/// Viewport height used when `DUPGRID_VIEWPORT` is not set.
const DEFAULT_VIEWPORT: f64 = 600.0;

/// Interval between event pumps, roughly one frame.
const PUMP_INTERVAL: Duration = Duration::from_millis(16);

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dupgrid=info".parse()?),
        )
        .init();

    let root = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: dupgrid <directory>")?;
    let viewport = viewport_height()?;

    let engine = Arc::new(FolderEngine::new(&root));
    let mut table = GroupTable::new(engine, GridConfig::default());
    table.connect_row_updated(|update| {
        debug!(index = update.index, source = ?update.source, "Row updated");
    });
    table.reload()?;

    info!(
        root = %root.display(),
        groups = table.groups().len(),
        anchors = ?table.anchors(),
        "Loaded result set"
    );

    // Scroll through the whole extent one viewport at a time, like a user paging down.
    let extent = table.total_extent().unwrap_or(0.0);
    let mut offset = 0.0;
    while offset < extent {
        let change = table.on_viewport_changed(offset, viewport);
        table.pump();
        info!(
            offset,
            visible = ?change.visible,
            materialized = change.materialized.len(),
            discarded = change.discarded.len(),
            resident = table.resident_indices().len(),
            "Scrolled"
        );
        offset += viewport;
    }

    // A worker that died without reporting back must not keep us here.
    while !table.is_prefetch_finished() {
        let running = table.is_prefetch_running();
        table.pump();
        if !running {
            if !table.is_prefetch_finished() {
                warn!("Prefetch worker exited without finishing");
            }
            break;
        }
        std::thread::sleep(PUMP_INTERVAL);
    }

    let stats = table.cache().stats();
    info!(
        entries = table.cache().len(),
        memory_bytes = table.cache().memory_usage(),
        hits = stats.hits,
        misses = stats.misses,
        decodes = stats.decodes,
        failures = stats.failures,
        evictions = stats.evictions,
        complete = table.is_prefetch_complete(),
        "Prefetch done"
    );
    table.stop_prefetch();
    Ok(())
}

fn viewport_height() -> Result<f64> {
    match std::env::var("DUPGRID_VIEWPORT") {
        Ok(value) => value
            .parse()
            .with_context(|| format!("Invalid DUPGRID_VIEWPORT: {value:?}")),
        Err(_) => Ok(DEFAULT_VIEWPORT),
    }
}
