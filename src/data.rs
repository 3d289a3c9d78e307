use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Stable workspace key. Hyprland workspace ids are compositor-global
/// and survive renames, unlike workspace names.
pub type WorkspaceId = i32;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SavedWorkspace {
    pub id: WorkspaceId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub monitor: String,
    #[serde(default)]
    pub windows: u16,
    #[serde(default, rename = "hasfullscreen")]
    pub has_fullscreen: bool,
}

/// One live window as seen at capture time. `handle` is the compositor
/// address of the window and is only valid within the session it was
/// captured in; restoration re-resolves windows by class ordinal instead.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WindowState {
    pub handle: String,
    pub app_class: String,
    #[serde(default)]
    pub title: String,
    pub workspace_id: WorkspaceId,
    #[serde(default)]
    pub position: (i32, i32),
    #[serde(default)]
    pub size: (i32, i32),
    #[serde(default)]
    pub floating: bool,
    #[serde(default)]
    pub fullscreen: bool,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub monitor: String,
}

/// Launch intent for one application, kept separately from `WindowState`
/// so the intent survives even when the window died before restoration.
/// `workspace_id` is `None` for entries recovered from the legacy flat
/// mapping, which never recorded workspace assignment.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppMapping {
    pub app_class: String,
    #[serde(default)]
    pub workspace_id: Option<WorkspaceId>,
    #[serde(default)]
    pub title: String,
    pub launch_command: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActiveWorkspace {
    pub id: WorkspaceId,
    #[serde(default)]
    pub name: String,
}

/// Point-in-time record of the whole session. Written atomically by the
/// capture service, immutable afterwards; ordered by `taken_at`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub taken_at: DateTime<Local>,
    #[serde(default)]
    pub workspaces: Vec<SavedWorkspace>,
    #[serde(default)]
    pub windows: Vec<WindowState>,
    #[serde(default)]
    pub applications: Vec<AppMapping>,
    #[serde(default)]
    pub active_workspace: Option<ActiveWorkspace>,
}

impl Snapshot {
    /// A degraded snapshot came from the legacy flat mapping: launch
    /// intents only, no workspace layout and no window geometry.
    pub fn is_degraded(&self) -> bool {
        self.workspaces.is_empty() && self.windows.is_empty()
    }
}
