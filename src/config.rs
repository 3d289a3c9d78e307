use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

pub const SESSION_DIR_ENV: &str = "HYPRPERSIST_DIR";

/// Classes whose lowercased window class is not a usable launch command.
/// Anything not listed here and not overridden in the config file is
/// launched as its lowercased class name.
const BUILTIN_LAUNCHERS: &[(&str, &str)] = &[
    ("brave-browser", "brave"),
    ("gnome-terminal-server", "gnome-terminal"),
    ("google-chrome", "google-chrome-stable"),
    ("org.wezfurlong.wezterm", "wezterm"),
    ("vscodium", "codium"),
];

/// Where session state lives. Defaults to `~/.config/hyprpersist`,
/// overridable through `HYPRPERSIST_DIR`.
#[derive(Clone, Debug)]
pub struct SessionDirs {
    root: PathBuf,
}

impl SessionDirs {
    pub fn from_env() -> anyhow::Result<Self> {
        if let Ok(dir) = std::env::var(SESSION_DIR_ENV) {
            return Ok(Self { root: dir.into() });
        }
        let home = std::env::var("HOME")
            .map_err(|_| anyhow::anyhow!("neither {SESSION_DIR_ENV} nor HOME is set"))?;
        Ok(Self {
            root: Path::new(&home).join(".config/hyprpersist"),
        })
    }

    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn snapshots(&self) -> PathBuf {
        self.root.join("snapshots")
    }

    /// Legacy flat mapping, one `handle:appClass:title` triple per line.
    pub fn legacy_mapping(&self) -> PathBuf {
        self.root.join("windows.txt")
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.json")
    }

    pub fn hooks(&self, stage: &str) -> PathBuf {
        self.root.join("hooks").join(stage)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Poll attempts per launched application before giving up on its window.
    pub poll_attempts: u32,
    pub poll_interval_secs: u64,
    /// Delay between successive application launches.
    pub launch_stagger_secs: u64,
    /// Overall restoration deadline. Hitting it abandons the current poll
    /// and skips remaining launches instead of blocking indefinitely.
    pub restore_deadline_secs: u64,
    pub max_backups: usize,
    /// Issue workspace-switch requests for a whole phase concurrently.
    /// Off by default; only safe for order-independent broadcasts.
    pub parallel_dispatch: bool,
    /// Per-class launch command overrides, keyed by lowercased class.
    pub apps: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_attempts: 30,
            poll_interval_secs: 1,
            launch_stagger_secs: 2,
            restore_deadline_secs: 45,
            max_backups: 10,
            parallel_dispatch: false,
            apps: HashMap::new(),
        }
    }
}

impl Config {
    /// Absent or unparsable config is never fatal; both fall back to the
    /// defaults with a log line saying so.
    pub fn load(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) => {
                log::info!("No config at {}, using defaults: {err}", path.display());
                return Self::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(config) => config,
            Err(err) => {
                log::warn!(
                    "Unparsable config at {}, using defaults: {err}",
                    path.display()
                );
                Self::default()
            }
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn launch_stagger(&self) -> Duration {
        Duration::from_secs(self.launch_stagger_secs)
    }

    pub fn restore_deadline(&self) -> Duration {
        Duration::from_secs(self.restore_deadline_secs)
    }

    /// Best-effort app class to launch command mapping: config override,
    /// then the builtin table, then the lowercased class itself.
    pub fn launch_command(&self, app_class: &str) -> String {
        let class = app_class.to_lowercase();
        if let Some(cmd) = self.apps.get(&class) {
            return cmd.clone();
        }
        BUILTIN_LAUNCHERS
            .iter()
            .find(|(cls, _)| *cls == class)
            .map(|(_, cmd)| (*cmd).to_string())
            .unwrap_or(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_restore_policy() {
        let config = Config::default();
        assert_eq!(config.poll_attempts, 30);
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.launch_stagger(), Duration::from_secs(2));
        assert_eq!(config.restore_deadline(), Duration::from_secs(45));
        assert_eq!(config.max_backups, 10);
        assert!(!config.parallel_dispatch);
    }

    #[test]
    fn launch_command_resolution_order() {
        let mut config = Config::default();
        config
            .apps
            .insert("firefox".into(), "firefox --new-instance".into());

        // config override wins
        assert_eq!(config.launch_command("Firefox"), "firefox --new-instance");
        // builtin table next
        assert_eq!(config.launch_command("Brave-browser"), "brave");
        // lowercased class as last resort
        assert_eq!(config.launch_command("Alacritty"), "alacritty");
    }

    #[test]
    fn partial_config_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"pollAttempts": 5}"#).unwrap();

        let config = Config::load(&path);
        assert_eq!(config.poll_attempts, 5);
        assert_eq!(config.launch_stagger_secs, 2);
    }

    #[test]
    fn corrupt_config_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, b"{not json").unwrap();

        let config = Config::load(&path);
        assert_eq!(config.poll_attempts, 30);
    }

    #[test]
    fn session_dirs_layout() {
        let dirs = SessionDirs::at("/tmp/hp-test");
        assert_eq!(dirs.snapshots(), Path::new("/tmp/hp-test/snapshots"));
        assert_eq!(
            dirs.legacy_mapping(),
            Path::new("/tmp/hp-test/windows.txt")
        );
        assert_eq!(
            dirs.hooks("pre-capture"),
            Path::new("/tmp/hp-test/hooks/pre-capture")
        );
    }
}
