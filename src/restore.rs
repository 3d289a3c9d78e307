use std::collections::HashMap;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::compositor::Compositor;
use crate::config::Config;
use crate::data::{AppMapping, Snapshot, WindowState};
use crate::store::SnapshotStore;
use crate::validate::{self, ValidationReport};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    WorkspaceRecreation,
    ApplicationLaunch,
    WindowPositioning,
    FocusRestore,
    Validation,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::WorkspaceRecreation => "workspace recreation",
            Self::ApplicationLaunch => "application launch",
            Self::WindowPositioning => "window positioning",
            Self::FocusRestore => "focus restore",
            Self::Validation => "validation",
        })
    }
}

/// Outcome of one phase item. Failures never cross phase boundaries;
/// they are recorded here and the phase moves on.
#[derive(Clone, Debug, PartialEq)]
pub enum ItemOutcome {
    Done,
    Skipped(String),
    Failed(String),
}

#[derive(Debug)]
pub struct ItemReport {
    pub target: String,
    pub outcome: ItemOutcome,
}

#[derive(Debug)]
pub struct PhaseReport {
    pub phase: Phase,
    /// Set when the whole phase was skipped for missing data.
    pub skipped: Option<String>,
    pub items: Vec<ItemReport>,
}

impl PhaseReport {
    fn new(phase: Phase) -> Self {
        Self {
            phase,
            skipped: None,
            items: Vec::new(),
        }
    }

    fn skip(phase: Phase, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        log::info!("Skipping {phase}: {reason}");
        Self {
            phase,
            skipped: Some(reason),
            items: Vec::new(),
        }
    }

    fn push(&mut self, target: impl Into<String>, outcome: ItemOutcome) {
        let target = target.into();
        match &outcome {
            ItemOutcome::Done => log::debug!("{}: {target} done", self.phase),
            ItemOutcome::Skipped(reason) => log::info!("{}: {target} skipped: {reason}", self.phase),
            ItemOutcome::Failed(reason) => log::warn!("{}: {target} failed: {reason}", self.phase),
        }
        self.items.push(ItemReport { target, outcome });
    }

    pub fn done(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Done))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Failed(_)))
    }

    pub fn skipped_items(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Skipped(_)))
    }

    fn count(&self, pred: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.items.iter().filter(|item| pred(&item.outcome)).count()
    }
}

/// Terminal states of a restoration run. Per-item failure does not
/// produce a third state: a run that executed its applicable phases is
/// COMPLETED however many items misbehaved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestoreOutcome {
    Completed,
    Aborted,
}

#[derive(Debug)]
pub struct RestoreReport {
    pub outcome: RestoreOutcome,
    pub phases: Vec<PhaseReport>,
    pub validation: Option<ValidationReport>,
}

impl std::fmt::Display for RestoreReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.outcome {
            RestoreOutcome::Completed => writeln!(f, "Restoration completed")?,
            RestoreOutcome::Aborted => writeln!(f, "Restoration aborted: no snapshot could be loaded")?,
        }
        for phase in &self.phases {
            match &phase.skipped {
                Some(reason) => writeln!(f, "  {}: skipped ({reason})", phase.phase)?,
                None => writeln!(
                    f,
                    "  {}: {} ok, {} failed, {} skipped",
                    phase.phase,
                    phase.done(),
                    phase.failed(),
                    phase.skipped_items()
                )?,
            }
        }
        if let Some(validation) = &self.validation {
            writeln!(f, "  completion: {validation}")?;
        }
        Ok(())
    }
}

/// Pick the restoration target: an explicitly named snapshot, else the
/// newest structured one, else the legacy flat mapping.
pub fn load_target(store: &SnapshotStore, config: &Config, name: Option<&str>) -> Option<Snapshot> {
    if let Some(name) = name {
        return store.read_named(name);
    }
    store
        .read_latest()
        .or_else(|| store.read_legacy(|class| config.launch_command(class)))
}

/// Drives the phase sequence against the compositor. One snapshot in,
/// one report out; a single pass by design, no whole-pipeline retry.
/// Callers must not run two restorations concurrently: double launches
/// of the same application set would duplicate windows.
pub struct Orchestrator<'a, C> {
    comp: &'a C,
    config: &'a Config,
    cancel: CancellationToken,
}

impl<'a, C: Compositor> Orchestrator<'a, C> {
    pub fn new(comp: &'a C, config: &'a Config) -> Self {
        Self::with_cancellation(comp, config, CancellationToken::new())
    }

    pub fn with_cancellation(comp: &'a C, config: &'a Config, cancel: CancellationToken) -> Self {
        Self {
            comp,
            config,
            cancel,
        }
    }

    pub async fn run(&self, snapshot: Option<Snapshot>) -> RestoreReport {
        let Some(snapshot) = snapshot else {
            log::error!("No snapshot of any format could be loaded");
            return RestoreReport {
                outcome: RestoreOutcome::Aborted,
                phases: Vec::new(),
                validation: None,
            };
        };

        log::info!(
            "Restoring snapshot from {} ({} workspaces, {} windows, {} launch intents)",
            snapshot.taken_at,
            snapshot.workspaces.len(),
            snapshot.windows.len(),
            snapshot.applications.len()
        );
        let deadline = Instant::now() + self.config.restore_deadline();

        let mut phases = Vec::new();
        phases.push(self.recreate_workspaces(&snapshot).await);
        phases.push(self.launch_applications(&snapshot, deadline).await);
        phases.push(self.position_windows(&snapshot, deadline).await);
        phases.push(self.restore_focus(&snapshot).await);
        let (phase, validation) = self.run_validation(&snapshot).await;
        phases.push(phase);

        RestoreReport {
            outcome: RestoreOutcome::Completed,
            phases,
            validation,
        }
    }

    /// Phase 1. Switching to a workspace id creates it when missing and
    /// is a no-op when it exists, so recreation is idempotent.
    async fn recreate_workspaces(&self, snapshot: &Snapshot) -> PhaseReport {
        if snapshot.workspaces.is_empty() {
            return PhaseReport::skip(
                Phase::WorkspaceRecreation,
                "no workspace layout in snapshot",
            );
        }
        let mut report = PhaseReport::new(Phase::WorkspaceRecreation);

        // Switch requests have no ordering dependency on each other, so
        // they may optionally be broadcast concurrently.
        let switch_results: Vec<anyhow::Result<()>> = if self.config.parallel_dispatch {
            futures::future::join_all(
                snapshot
                    .workspaces
                    .iter()
                    .map(|ws| self.comp.switch_workspace(ws.id)),
            )
            .await
        } else {
            let mut results = Vec::with_capacity(snapshot.workspaces.len());
            for ws in &snapshot.workspaces {
                results.push(self.comp.switch_workspace(ws.id).await);
            }
            results
        };

        for (ws, switched) in snapshot.workspaces.iter().zip(switch_results) {
            let target = format!("workspace {}", ws.id);
            let outcome = match switched {
                Err(err) => ItemOutcome::Failed(format!("switch: {err}")),
                Ok(()) if ws.name.is_empty() => ItemOutcome::Done,
                Ok(()) => match self.comp.rename_workspace(ws.id, &ws.name).await {
                    Ok(()) => ItemOutcome::Done,
                    Err(err) => ItemOutcome::Failed(format!("rename: {err}")),
                },
            };
            report.push(target, outcome);
        }
        report
    }

    /// Phase 2. Launches are staggered, and each launch is followed by a
    /// bounded poll for a window of the launched class. The overall
    /// deadline abandons the current poll and skips remaining launches.
    async fn launch_applications(&self, snapshot: &Snapshot, deadline: Instant) -> PhaseReport {
        if snapshot.applications.is_empty() {
            return PhaseReport::skip(Phase::ApplicationLaunch, "no launch intents in snapshot");
        }
        let mut report = PhaseReport::new(Phase::ApplicationLaunch);
        if snapshot.is_degraded() {
            log::info!("Legacy mapping: launching without workspace assignment");
        }

        for (idx, app) in snapshot.applications.iter().enumerate() {
            if self.cancel.is_cancelled() {
                report.push(app.app_class.clone(), skipped_cancelled());
                continue;
            }
            if Instant::now() >= deadline {
                report.push(
                    app.app_class.clone(),
                    ItemOutcome::Skipped("restore deadline exceeded".into()),
                );
                continue;
            }
            if idx > 0 {
                tokio::select! {
                    _ = tokio::time::sleep(self.config.launch_stagger()) => {}
                    _ = self.cancel.cancelled() => {}
                }
            }
            let outcome = self.launch_one(app, deadline).await;
            report.push(app.app_class.clone(), outcome);
        }
        report
    }

    async fn launch_one(&self, app: &AppMapping, deadline: Instant) -> ItemOutcome {
        if self.cancel.is_cancelled() {
            return skipped_cancelled();
        }
        if let Some(ws) = app.workspace_id
            && let Err(err) = self.comp.switch_workspace(ws).await
        {
            // launch on whatever workspace is current instead
            log::warn!("Cannot switch to workspace {ws} for {}: {err}", app.app_class);
        }

        // Pre-existing windows of the class must not satisfy the poll.
        let before = match self.comp.list_windows().await {
            Ok(windows) => count_class(&windows, &app.app_class),
            Err(err) => {
                log::warn!("Cannot list windows before launching {}: {err}", app.app_class);
                0
            }
        };

        if let Err(err) = self.comp.spawn(&app.launch_command).await {
            return ItemOutcome::Failed(format!("spawn `{}`: {err}", app.launch_command));
        }
        log::info!("Launched `{}`, waiting for a {} window", app.launch_command, app.app_class);

        for attempt in 1..=self.config.poll_attempts {
            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval()) => {}
                _ = self.cancel.cancelled() => {
                    return ItemOutcome::Failed("cancelled while waiting for window".into());
                }
            }
            match self.comp.list_windows().await {
                Ok(windows) => {
                    if count_class(&windows, &app.app_class) > before {
                        log::debug!("{} window appeared after {attempt} attempts", app.app_class);
                        return ItemOutcome::Done;
                    }
                }
                Err(err) => log::warn!("Window poll for {} failed: {err}", app.app_class),
            }
            if Instant::now() >= deadline {
                return ItemOutcome::Failed(format!(
                    "restore deadline hit after {attempt} attempts"
                ));
            }
        }
        ItemOutcome::Failed(format!(
            "no {} window after {} attempts",
            app.app_class, self.config.poll_attempts
        ))
    }

    /// Phase 3. Saved handles are stale after a compositor restart;
    /// windows are re-resolved as the nth live window of the saved class.
    /// Past the deadline the run goes straight to focus and validation,
    /// no further per-window dispatches.
    async fn position_windows(&self, snapshot: &Snapshot, deadline: Instant) -> PhaseReport {
        if self.cancel.is_cancelled() {
            return PhaseReport::skip(Phase::WindowPositioning, "restoration cancelled");
        }
        if Instant::now() >= deadline {
            return PhaseReport::skip(Phase::WindowPositioning, "restore deadline exceeded");
        }
        if snapshot.windows.is_empty() {
            return PhaseReport::skip(Phase::WindowPositioning, "no window geometry in snapshot");
        }
        let live = match self.comp.list_windows().await {
            Ok(live) => live,
            Err(err) => {
                return PhaseReport::skip(
                    Phase::WindowPositioning,
                    format!("cannot list live windows: {err}"),
                );
            }
        };

        let mut by_class: HashMap<String, Vec<&WindowState>> = HashMap::new();
        for win in &live {
            by_class
                .entry(win.app_class.to_lowercase())
                .or_default()
                .push(win);
        }

        let mut report = PhaseReport::new(Phase::WindowPositioning);
        let mut ordinals: HashMap<String, usize> = HashMap::new();
        for saved in &snapshot.windows {
            let class = saved.app_class.to_lowercase();
            let ordinal = *ordinals.get(&class).unwrap_or(&0);
            ordinals.insert(class.clone(), ordinal + 1);

            let resolved = by_class
                .get(&class)
                .and_then(|wins| wins.get(ordinal))
                .copied();
            let outcome = match resolved {
                None => ItemOutcome::Skipped(format!("no live {} window", saved.app_class)),
                Some(live_win) => self.position_one(saved, live_win).await,
            };
            report.push(format!("{} #{ordinal}", saved.app_class), outcome);
        }
        report
    }

    async fn position_one(&self, saved: &WindowState, live: &WindowState) -> ItemOutcome {
        let handle = &live.handle;
        let mut first_err: Option<String> = None;
        let mut note = |what: &str, res: anyhow::Result<()>| {
            if let Err(err) = res {
                log::warn!("{what} failed for {handle}: {err}");
                if first_err.is_none() {
                    first_err = Some(format!("{what}: {err}"));
                }
            }
        };

        // A saved workspace id missing from the snapshot's layout is
        // created on demand by the move itself.
        if live.workspace_id != saved.workspace_id {
            let res = self
                .comp
                .move_window_to_workspace(handle, saved.workspace_id, true)
                .await;
            note("move to workspace", res);
        }
        if live.floating != saved.floating {
            note("toggle floating", self.comp.toggle_floating(handle).await);
        }
        // Tiled geometry is owned by the layout engine; pixel placement
        // only makes sense for floating windows and is best-effort even
        // then, the application may resist.
        if saved.floating {
            let (x, y) = saved.position;
            note("move", self.comp.move_window(handle, x, y).await);
            let (w, h) = saved.size;
            note("resize", self.comp.resize_window(handle, w, h).await);
        }
        if live.fullscreen != saved.fullscreen {
            note("toggle fullscreen", self.comp.toggle_fullscreen(handle).await);
        }
        if live.pinned != saved.pinned {
            note("toggle pinned", self.comp.toggle_pinned(handle).await);
        }

        match first_err {
            None => ItemOutcome::Done,
            Some(err) => ItemOutcome::Failed(err),
        }
    }

    /// Phase 4.
    async fn restore_focus(&self, snapshot: &Snapshot) -> PhaseReport {
        if self.cancel.is_cancelled() {
            return PhaseReport::skip(Phase::FocusRestore, "restoration cancelled");
        }
        let Some(active) = &snapshot.active_workspace else {
            return PhaseReport::skip(Phase::FocusRestore, "no focused workspace recorded");
        };
        let mut report = PhaseReport::new(Phase::FocusRestore);
        let outcome = match self.comp.switch_workspace(active.id).await {
            Ok(()) => ItemOutcome::Done,
            Err(err) => ItemOutcome::Failed(err.to_string()),
        };
        report.push(format!("workspace {}", active.id), outcome);
        report
    }

    /// Phase 5. Informational only: a shortfall is logged, never retried.
    async fn run_validation(
        &self,
        snapshot: &Snapshot,
    ) -> (PhaseReport, Option<ValidationReport>) {
        if self.cancel.is_cancelled() {
            return (
                PhaseReport::skip(Phase::Validation, "restoration cancelled"),
                None,
            );
        }
        let mut report = PhaseReport::new(Phase::Validation);
        match validate::validate(self.comp, snapshot).await {
            Ok(validation) => {
                if validation.is_complete() {
                    log::info!("Validation: {validation}");
                } else {
                    log::warn!("Partial restoration: {validation}");
                }
                report.push("workspace count", ItemOutcome::Done);
                (report, Some(validation))
            }
            Err(err) => {
                report.push("workspace count", ItemOutcome::Failed(err.to_string()));
                (report, None)
            }
        }
    }
}

fn skipped_cancelled() -> ItemOutcome {
    ItemOutcome::Skipped("restoration cancelled".into())
}

fn count_class(windows: &[WindowState], app_class: &str) -> usize {
    windows
        .iter()
        .filter(|win| win.app_class.eq_ignore_ascii_case(app_class))
        .count()
}
