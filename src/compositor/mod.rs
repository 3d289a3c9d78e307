use anyhow::Result;

use crate::data::{ActiveWorkspace, SavedWorkspace, WindowState, WorkspaceId};

pub mod hypr;
#[cfg(test)]
pub mod mock;

/// Monitor as the capture service needs it: just the name and which
/// workspace it currently shows, for attributing workspaces to outputs.
#[derive(Clone, Debug)]
pub struct MonitorInfo {
    pub name: String,
    pub workspace_id: WorkspaceId,
}

/// Query/command surface of the live compositor. Everything the capture
/// service and the orchestrator do goes through this trait; the live
/// implementation is [`hypr::HyprCompositor`], tests drive a scripted
/// [`mock::MockCompositor`].
///
/// `spawn` is fire and forget: there is no synchronous window handle for
/// a launched process, discovery is by polling `list_windows`.
#[allow(async_fn_in_trait)]
pub trait Compositor {
    async fn list_workspaces(&self) -> Result<Vec<SavedWorkspace>>;
    async fn list_windows(&self) -> Result<Vec<WindowState>>;
    async fn list_monitors(&self) -> Result<Vec<MonitorInfo>>;
    async fn active_workspace(&self) -> Result<ActiveWorkspace>;

    async fn switch_workspace(&self, id: WorkspaceId) -> Result<()>;
    async fn rename_workspace(&self, id: WorkspaceId, name: &str) -> Result<()>;

    async fn move_window_to_workspace(
        &self,
        handle: &str,
        id: WorkspaceId,
        silent: bool,
    ) -> Result<()>;
    async fn toggle_floating(&self, handle: &str) -> Result<()>;
    async fn toggle_fullscreen(&self, handle: &str) -> Result<()>;
    async fn toggle_pinned(&self, handle: &str) -> Result<()>;
    async fn move_window(&self, handle: &str, x: i32, y: i32) -> Result<()>;
    async fn resize_window(&self, handle: &str, w: i32, h: i32) -> Result<()>;

    async fn spawn(&self, command: &str) -> Result<()>;
}
