use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{Result, anyhow, bail};

use crate::compositor::{Compositor, MonitorInfo};
use crate::data::{ActiveWorkspace, SavedWorkspace, WindowState, WorkspaceId};

/// Scripted in-memory compositor. Starts as an empty desktop; tests seed
/// workspaces/windows directly and register spawn effects describing
/// which window class a launch command eventually produces, optionally
/// delayed by a number of `list_windows` polls to exercise the polling
/// loop.
#[derive(Default)]
pub struct MockCompositor {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    workspaces: Vec<SavedWorkspace>,
    windows: Vec<WindowState>,
    monitors: Vec<MonitorInfo>,
    active: Option<ActiveWorkspace>,
    on_spawn: HashMap<String, SpawnEffect>,
    pending: Vec<Pending>,
    spawned: Vec<String>,
    list_windows_calls: u32,
    next_handle: u64,
    unreachable: bool,
    fail_rename: bool,
}

struct SpawnEffect {
    app_class: String,
    appear_after_polls: u32,
}

struct Pending {
    window: WindowState,
    remaining_polls: u32,
}

impl MockCompositor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_workspace(&self, id: WorkspaceId, name: &str) {
        let mut state = self.state.lock().unwrap();
        state.workspaces.push(SavedWorkspace {
            id,
            name: name.into(),
            monitor: String::new(),
            windows: 0,
            has_fullscreen: false,
        });
    }

    pub fn add_window(&self, window: WindowState) {
        self.state.lock().unwrap().windows.push(window);
    }

    pub fn add_monitor(&self, info: MonitorInfo) {
        self.state.lock().unwrap().monitors.push(info);
    }

    pub fn set_active_workspace(&self, id: WorkspaceId, name: &str) {
        self.state.lock().unwrap().active = Some(ActiveWorkspace {
            id,
            name: name.into(),
        });
    }

    /// `spawn(command)` will materialize one window of `app_class` on the
    /// next `list_windows` call.
    pub fn on_spawn(&self, command: &str, app_class: &str) {
        self.on_spawn_after(command, app_class, 0);
    }

    /// Same, but the window only shows up after `polls` further
    /// `list_windows` calls, simulating slow application startup.
    pub fn on_spawn_after(&self, command: &str, app_class: &str, polls: u32) {
        self.state.lock().unwrap().on_spawn.insert(
            command.into(),
            SpawnEffect {
                app_class: app_class.into(),
                appear_after_polls: polls,
            },
        );
    }

    /// Every subsequent call fails, as if the compositor socket is gone.
    pub fn set_unreachable(&self) {
        self.state.lock().unwrap().unreachable = true;
    }

    pub fn fail_renames(&self) {
        self.state.lock().unwrap().fail_rename = true;
    }

    pub fn spawned_commands(&self) -> Vec<String> {
        self.state.lock().unwrap().spawned.clone()
    }

    pub fn workspace_count(&self) -> usize {
        self.state.lock().unwrap().workspaces.len()
    }

    pub fn workspace_name(&self, id: WorkspaceId) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .workspaces
            .iter()
            .find(|ws| ws.id == id)
            .map(|ws| ws.name.clone())
    }

    pub fn focused_workspace(&self) -> Option<WorkspaceId> {
        self.state.lock().unwrap().active.as_ref().map(|ws| ws.id)
    }

    pub fn windows(&self) -> Vec<WindowState> {
        self.state.lock().unwrap().windows.clone()
    }

    pub fn list_windows_calls(&self) -> u32 {
        self.state.lock().unwrap().list_windows_calls
    }
}

impl State {
    fn check_reachable(&self) -> Result<()> {
        if self.unreachable {
            bail!("compositor socket unreachable");
        }
        Ok(())
    }

    // Hyprland creates a workspace on first switch/move; mirror that.
    fn ensure_workspace(&mut self, id: WorkspaceId) {
        if !self.workspaces.iter().any(|ws| ws.id == id) {
            self.workspaces.push(SavedWorkspace {
                id,
                name: id.to_string(),
                monitor: String::new(),
                windows: 0,
                has_fullscreen: false,
            });
        }
    }

    fn window_mut(&mut self, handle: &str) -> Result<&mut WindowState> {
        self.windows
            .iter_mut()
            .find(|win| win.handle == handle)
            .ok_or_else(|| anyhow!("no window with handle {handle}"))
    }
}

impl Compositor for MockCompositor {
    async fn list_workspaces(&self) -> Result<Vec<SavedWorkspace>> {
        let state = self.state.lock().unwrap();
        state.check_reachable()?;
        Ok(state.workspaces.clone())
    }

    async fn list_windows(&self) -> Result<Vec<WindowState>> {
        let mut state = self.state.lock().unwrap();
        state.check_reachable()?;
        state.list_windows_calls += 1;

        let mut due = Vec::new();
        for pending in &mut state.pending {
            if pending.remaining_polls == 0 {
                due.push(pending.window.clone());
            } else {
                pending.remaining_polls -= 1;
            }
        }
        state
            .pending
            .retain(|pending| !due.iter().any(|win| win.handle == pending.window.handle));
        for window in due {
            state.ensure_workspace(window.workspace_id);
            state.windows.push(window);
        }
        Ok(state.windows.clone())
    }

    async fn list_monitors(&self) -> Result<Vec<MonitorInfo>> {
        let state = self.state.lock().unwrap();
        state.check_reachable()?;
        Ok(state.monitors.clone())
    }

    async fn active_workspace(&self) -> Result<ActiveWorkspace> {
        let state = self.state.lock().unwrap();
        state.check_reachable()?;
        state
            .active
            .clone()
            .ok_or_else(|| anyhow!("no focused workspace"))
    }

    async fn switch_workspace(&self, id: WorkspaceId) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.check_reachable()?;
        state.ensure_workspace(id);
        let name = state
            .workspaces
            .iter()
            .find(|ws| ws.id == id)
            .map(|ws| ws.name.clone())
            .unwrap_or_default();
        state.active = Some(ActiveWorkspace { id, name });
        Ok(())
    }

    async fn rename_workspace(&self, id: WorkspaceId, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.check_reachable()?;
        if state.fail_rename {
            bail!("rename dispatch refused");
        }
        let ws = state
            .workspaces
            .iter_mut()
            .find(|ws| ws.id == id)
            .ok_or_else(|| anyhow!("no workspace {id}"))?;
        ws.name = name.into();
        Ok(())
    }

    async fn move_window_to_workspace(
        &self,
        handle: &str,
        id: WorkspaceId,
        _silent: bool,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.check_reachable()?;
        state.ensure_workspace(id);
        state.window_mut(handle)?.workspace_id = id;
        Ok(())
    }

    async fn toggle_floating(&self, handle: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.check_reachable()?;
        let win = state.window_mut(handle)?;
        win.floating = !win.floating;
        Ok(())
    }

    async fn toggle_fullscreen(&self, handle: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.check_reachable()?;
        let win = state.window_mut(handle)?;
        win.fullscreen = !win.fullscreen;
        Ok(())
    }

    async fn toggle_pinned(&self, handle: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.check_reachable()?;
        let win = state.window_mut(handle)?;
        win.pinned = !win.pinned;
        Ok(())
    }

    async fn move_window(&self, handle: &str, x: i32, y: i32) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.check_reachable()?;
        state.window_mut(handle)?.position = (x, y);
        Ok(())
    }

    async fn resize_window(&self, handle: &str, w: i32, h: i32) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.check_reachable()?;
        state.window_mut(handle)?.size = (w, h);
        Ok(())
    }

    async fn spawn(&self, command: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.check_reachable()?;
        state.spawned.push(command.into());

        if let Some(effect) = state.on_spawn.get(command) {
            let workspace_id = state.active.as_ref().map(|ws| ws.id).unwrap_or(1);
            let app_class = effect.app_class.clone();
            let remaining_polls = effect.appear_after_polls;
            state.next_handle += 1;
            let handle = format!("0x{:x}", state.next_handle);
            state.pending.push(Pending {
                window: WindowState {
                    handle,
                    app_class,
                    title: String::new(),
                    workspace_id,
                    position: (0, 0),
                    size: (800, 600),
                    floating: false,
                    fullscreen: false,
                    pinned: false,
                    monitor: String::new(),
                },
                remaining_polls,
            });
        }
        Ok(())
    }
}
