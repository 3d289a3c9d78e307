use anyhow::Result;

use crate::compositor::Compositor;
use crate::data::Snapshot;

/// Workspace-count comparison between the target snapshot and the live
/// compositor. Deliberately coarse: per-window placement is best-effort
/// and not re-checked here.
#[derive(Clone, Copy, Debug)]
pub struct ValidationReport {
    pub expected_workspaces: usize,
    pub actual_workspaces: usize,
}

impl ValidationReport {
    pub fn ratio(&self) -> f64 {
        if self.expected_workspaces == 0 {
            1.0
        } else {
            self.actual_workspaces as f64 / self.expected_workspaces as f64
        }
    }

    pub fn is_complete(&self) -> bool {
        self.ratio() >= 1.0
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} workspaces ({:.0}%)",
            self.actual_workspaces,
            self.expected_workspaces,
            self.ratio() * 100.0
        )
    }
}

pub async fn validate<C: Compositor>(comp: &C, expected: &Snapshot) -> Result<ValidationReport> {
    let live = comp.list_workspaces().await?;
    Ok(ValidationReport {
        expected_workspaces: expected.workspaces.len(),
        actual_workspaces: live.len(),
    })
}
