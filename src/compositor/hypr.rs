use anyhow::Result;
use hyprland::data::*;
use hyprland::dispatch::*;
use hyprland::shared::{Address, HyprData, HyprDataActive};

use crate::compositor::{Compositor, MonitorInfo};
use crate::data::{ActiveWorkspace, SavedWorkspace, WindowState, WorkspaceId};

/// Live adapter over the Hyprland IPC sockets. Queries go through the
/// `hyprctl -j` style data requests, commands through dispatchers, the
/// same operations the compositor exposes to `hyprctl dispatch`.
pub struct HyprCompositor;

impl HyprCompositor {
    async fn dispatch(&self, dispatch: DispatchType<'_>) -> Result<()> {
        Dispatch::call_async(dispatch).await?;
        Ok(())
    }
}

fn window_ident(handle: &str) -> WindowIdentifier<'static> {
    WindowIdentifier::Address(Address::new(handle))
}

impl Compositor for HyprCompositor {
    async fn list_workspaces(&self) -> Result<Vec<SavedWorkspace>> {
        let wss = Workspaces::get_async().await?;
        Ok(wss
            .into_iter()
            .map(
                |Workspace {
                     id,
                     name,
                     monitor,
                     windows,
                     fullscreen,
                     ..
                 }| SavedWorkspace {
                    id,
                    name,
                    monitor,
                    windows,
                    has_fullscreen: fullscreen,
                },
            )
            .collect())
    }

    async fn list_windows(&self) -> Result<Vec<WindowState>> {
        // Clients carry the monitor id, not its name; join against the
        // monitor list so the snapshot stores the stable name.
        let monitors = Monitors::get_async().await?;
        let clients = Clients::get_async().await?;
        Ok(clients
            .into_iter()
            .map(
                |Client {
                     address,
                     at,
                     size,
                     workspace,
                     class,
                     title,
                     floating,
                     fullscreen,
                     pinned,
                     monitor,
                     ..
                 }| {
                    let monitor = monitors
                        .iter()
                        .find(|m| Some(m.id) == monitor)
                        .map(|m| m.name.clone())
                        .unwrap_or_default();
                    WindowState {
                        handle: address.to_string(),
                        app_class: class,
                        title,
                        workspace_id: workspace.id,
                        position: (at.0.into(), at.1.into()),
                        size: (size.0.into(), size.1.into()),
                        floating,
                        fullscreen: !matches!(fullscreen, FullscreenMode::None),
                        pinned,
                        monitor,
                    }
                },
            )
            .collect())
    }

    async fn list_monitors(&self) -> Result<Vec<MonitorInfo>> {
        let monitors = Monitors::get_async().await?;
        Ok(monitors
            .into_iter()
            .map(|mon| MonitorInfo {
                name: mon.name,
                workspace_id: mon.active_workspace.id,
            })
            .collect())
    }

    async fn active_workspace(&self) -> Result<ActiveWorkspace> {
        let ws = Workspace::get_active_async().await?;
        Ok(ActiveWorkspace {
            id: ws.id,
            name: ws.name,
        })
    }

    async fn switch_workspace(&self, id: WorkspaceId) -> Result<()> {
        self.dispatch(DispatchType::Workspace(
            WorkspaceIdentifierWithSpecial::Id(id),
        ))
        .await
    }

    async fn rename_workspace(&self, id: WorkspaceId, name: &str) -> Result<()> {
        self.dispatch(DispatchType::RenameWorkspace(id, Some(name)))
            .await
    }

    async fn move_window_to_workspace(
        &self,
        handle: &str,
        id: WorkspaceId,
        silent: bool,
    ) -> Result<()> {
        let ws = WorkspaceIdentifierWithSpecial::Id(id);
        let win = Some(window_ident(handle));
        self.dispatch(if silent {
            DispatchType::MoveToWorkspaceSilent(ws, win)
        } else {
            DispatchType::MoveToWorkspace(ws, win)
        })
        .await
    }

    async fn toggle_floating(&self, handle: &str) -> Result<()> {
        self.dispatch(DispatchType::ToggleFloating(Some(window_ident(handle))))
            .await
    }

    async fn toggle_fullscreen(&self, handle: &str) -> Result<()> {
        // The fullscreen dispatcher only targets the focused window.
        self.dispatch(DispatchType::FocusWindow(window_ident(handle)))
            .await?;
        self.dispatch(DispatchType::ToggleFullscreen(FullscreenType::Real))
            .await
    }

    async fn toggle_pinned(&self, handle: &str) -> Result<()> {
        self.dispatch(DispatchType::FocusWindow(window_ident(handle)))
            .await?;
        self.dispatch(DispatchType::TogglePin).await
    }

    async fn move_window(&self, handle: &str, x: i32, y: i32) -> Result<()> {
        self.dispatch(DispatchType::MoveWindowPixel(
            Position::Exact(x as i16, y as i16),
            window_ident(handle),
        ))
        .await
    }

    async fn resize_window(&self, handle: &str, w: i32, h: i32) -> Result<()> {
        self.dispatch(DispatchType::ResizeWindowPixel(
            Position::Exact(w as i16, h as i16),
            window_ident(handle),
        ))
        .await
    }

    async fn spawn(&self, command: &str) -> Result<()> {
        self.dispatch(DispatchType::Exec(command)).await
    }
}
