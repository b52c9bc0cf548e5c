//! Watch command: print detected changes until Ctrl+C.

use std::path::PathBuf;
use std::time::Duration;

use crate::config::Settings;
use crate::watcher::{BackendId, PendingChanges, WatchCoordinator};

/// Watch `dirs` (or the configured targets) and print change batches.
pub async fn run_watch(
    config: &Settings,
    dirs: Vec<PathBuf>,
    backend: Option<BackendId>,
    interval: Option<u64>,
) -> anyhow::Result<()> {
    let mut watcher_config = config.watcher.clone();
    if let Some(backend) = backend {
        watcher_config.backend = Some(backend);
    }
    if let Some(ms) = interval {
        watcher_config.poll_interval_ms = ms;
    }

    let targets = if dirs.is_empty() {
        watcher_config.resolved_targets(&config.project_root())
    } else {
        dirs
    };

    let pending = PendingChanges::new(watcher_config.quiet_period());
    let coordinator = WatchCoordinator::start(&watcher_config, targets, pending.callback())?;

    eprintln!(
        "Watching with {} backend. Press Ctrl+C to stop.",
        coordinator.backend()
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut tick = tokio::time::interval(Duration::from_millis(50));
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            _ = tick.tick() => {
                if let Some(batch) = pending.take_ready() {
                    for event in batch {
                        println!("{event}");
                    }
                }
            }
        }
    }

    coordinator.close();
    for event in pending.take_all() {
        println!("{event}");
    }
    eprintln!("Stopped.");
    Ok(())
}
