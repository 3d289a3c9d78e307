use std::os::unix::fs::PermissionsExt as _;
use std::path::{Path, PathBuf};

use crate::config::SessionDirs;

/// Runs user-supplied scripts around the capture/restore pipeline:
/// everything executable in `hooks/pre-capture/` before a capture,
/// `hooks/post-restore/` after the restoration report. Scripts run in
/// file-name order; failures are logged and never propagate.
pub struct HookRunner {
    pre_capture: PathBuf,
    post_restore: PathBuf,
}

impl HookRunner {
    pub fn new(dirs: &SessionDirs) -> Self {
        Self {
            pre_capture: dirs.hooks("pre-capture"),
            post_restore: dirs.hooks("post-restore"),
        }
    }

    pub async fn run_pre_capture(&self) {
        run_dir(&self.pre_capture, "pre-capture").await;
    }

    pub async fn run_post_restore(&self) {
        run_dir(&self.post_restore, "post-restore").await;
    }
}

async fn run_dir(dir: &Path, stage: &str) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        log::debug!("No {stage} hook directory at {}", dir.display());
        return;
    };

    let mut scripts: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| is_executable_file(path))
        .collect();
    scripts.sort();

    for script in scripts {
        log::info!("Running {stage} hook {}", script.display());
        match tokio::process::Command::new(&script).status().await {
            Ok(status) if status.success() => {}
            Ok(status) => {
                log::warn!("{stage} hook {} exited with {status}", script.display());
            }
            Err(err) => {
                log::warn!("{stage} hook {} failed to start: {err}", script.display());
            }
        }
    }
}

fn is_executable_file(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}
