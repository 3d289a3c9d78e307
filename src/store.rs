use std::{
    io::Write as _,
    path::{Path, PathBuf},
};

use anyhow::{Context as _, Result};
use chrono::Local;

use crate::config::SessionDirs;
use crate::data::{AppMapping, Snapshot};

/// Durable snapshot storage. Structured snapshots live as one JSON file
/// per capture under the snapshot directory, named so lexicographic
/// order equals capture order; the legacy flat mapping is a single text
/// file of `handle:appClass:title` triples kept for old installations.
pub struct SnapshotStore {
    dir: PathBuf,
    legacy_path: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>, legacy_path: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            legacy_path: legacy_path.into(),
        }
    }

    pub fn from_dirs(dirs: &SessionDirs) -> Self {
        Self::new(dirs.snapshots(), dirs.legacy_mapping())
    }

    fn file_name(snapshot: &Snapshot) -> String {
        format!("session-{}.json", snapshot.taken_at.format("%Y%m%d-%H%M%S"))
    }

    /// Atomic: the snapshot is serialized into a temp file in the same
    /// directory and renamed into place, so readers never observe a
    /// partial record set.
    pub fn write(&self, snapshot: &Snapshot) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating snapshot dir {}", self.dir.display()))?;
        let path = self.dir.join(Self::file_name(snapshot));

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(&mut tmp, snapshot)?;
        tmp.flush()?;
        tmp.persist(&path)
            .with_context(|| format!("persisting snapshot to {}", path.display()))?;

        log::info!("Snapshot written to {}", path.display());
        Ok(path)
    }

    /// All structured snapshot files, oldest first.
    pub fn list(&self) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with("session-") && name.ends_with(".json"))
            })
            .collect();
        files.sort();
        files
    }

    /// Newest structured snapshot that still parses. Corrupt files are
    /// logged and skipped in favor of older valid ones; `None` only when
    /// no structured file is readable, so the caller can fall back to
    /// the legacy format.
    pub fn read_latest(&self) -> Option<Snapshot> {
        self.list()
            .into_iter()
            .rev()
            .find_map(|path| self.read_file(&path))
    }

    /// A specific snapshot file by name, for `restore <snapshot>`.
    pub fn read_named(&self, name: &str) -> Option<Snapshot> {
        self.read_file(&self.dir.join(name))
    }

    fn read_file(&self, path: &Path) -> Option<Snapshot> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| log::warn!("Cannot read snapshot {}: {err}", path.display()))
            .ok()?;
        serde_json::from_str(&raw)
            .map_err(|err| log::warn!("Skipping corrupt snapshot {}: {err}", path.display()))
            .ok()
    }

    /// Legacy flat mapping reader. Produces a degraded snapshot with
    /// launch intents only; `lookup` turns an app class into its launch
    /// command. Returns `None` when the file is absent or holds no
    /// usable triple.
    pub fn read_legacy(&self, lookup: impl Fn(&str) -> String) -> Option<Snapshot> {
        let raw = std::fs::read_to_string(&self.legacy_path).ok()?;

        let mut applications = Vec::new();
        for line in raw.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            // handle:appClass:title, where the title may itself contain colons
            let mut parts = line.splitn(3, ':');
            let (Some(_handle), Some(app_class)) = (parts.next(), parts.next()) else {
                log::warn!("Skipping malformed legacy mapping line: {line}");
                continue;
            };
            if app_class.is_empty() {
                log::warn!("Skipping legacy mapping line without class: {line}");
                continue;
            }
            applications.push(AppMapping {
                app_class: app_class.to_string(),
                workspace_id: None,
                title: parts.next().unwrap_or_default().to_string(),
                launch_command: lookup(app_class),
            });
        }

        if applications.is_empty() {
            return None;
        }
        log::info!(
            "Loaded legacy flat mapping with {} applications from {}",
            applications.len(),
            self.legacy_path.display()
        );
        Some(Snapshot {
            taken_at: Local::now(),
            workspaces: Vec::new(),
            windows: Vec::new(),
            applications,
            active_workspace: None,
        })
    }

    pub fn legacy_exists(&self) -> bool {
        self.legacy_path.exists()
    }

    /// Drop the oldest snapshots beyond `keep`, returning how many were
    /// removed. Old snapshots are otherwise retained for rollback.
    pub fn prune(&self, keep: usize) -> Result<usize> {
        let files = self.list();
        let excess = files.len().saturating_sub(keep);
        for path in &files[..excess] {
            std::fs::remove_file(path)
                .with_context(|| format!("removing old snapshot {}", path.display()))?;
            log::info!("Removed old snapshot {}", path.display());
        }
        Ok(excess)
    }
}
