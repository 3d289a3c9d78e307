use anyhow::{Context as _, Result};
use chrono::Local;

use crate::compositor::Compositor;
use crate::config::Config;
use crate::data::{AppMapping, Snapshot};
use crate::store::SnapshotStore;

/// Take a point-in-time snapshot of the live session and persist it.
///
/// All compositor queries must succeed before anything is written: an
/// unreachable compositor fails the whole capture and leaves the store
/// untouched, so a snapshot is either complete or absent.
pub async fn capture<C: Compositor>(
    comp: &C,
    config: &Config,
    store: &SnapshotStore,
) -> Result<Snapshot> {
    let mut workspaces = comp.list_workspaces().await.context("listing workspaces")?;
    let windows = comp.list_windows().await.context("listing windows")?;
    let monitors = comp.list_monitors().await.context("listing monitors")?;
    let active_workspace = comp
        .active_workspace()
        .await
        .context("querying focused workspace")?;

    // Fill monitor assignment for workspaces the workspace query did not
    // attribute, from the monitor-to-workspace mapping.
    for ws in &mut workspaces {
        if ws.monitor.is_empty()
            && let Some(mon) = monitors.iter().find(|mon| mon.workspace_id == ws.id)
        {
            ws.monitor = mon.name.clone();
        }
    }

    // Launch intents are derived from the windows but persisted on their
    // own: a window may die before restoration, its relaunch should not.
    let applications = windows
        .iter()
        .map(|win| AppMapping {
            app_class: win.app_class.clone(),
            workspace_id: Some(win.workspace_id),
            title: win.title.clone(),
            launch_command: config.launch_command(&win.app_class),
        })
        .collect();

    let snapshot = Snapshot {
        taken_at: Local::now(),
        workspaces,
        windows,
        applications,
        active_workspace: Some(active_workspace),
    };

    store.write(&snapshot)?;
    log::info!(
        "Captured {} workspaces, {} windows, {} launch intents",
        snapshot.workspaces.len(),
        snapshot.windows.len(),
        snapshot.applications.len()
    );
    Ok(snapshot)
}
