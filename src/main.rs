mod capture;
mod compositor;
mod config;
mod data;
mod hooks;
mod logging;
mod restore;
mod store;
mod validate;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use crate::compositor::hypr::HyprCompositor;
use crate::config::{Config, SessionDirs};
use crate::hooks::HookRunner;
use crate::restore::{Orchestrator, RestoreOutcome};
use crate::store::SnapshotStore;

const USAGE: &str = "usage: hyprpersist <save | restore [snapshot] | status | clean>";

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    logging::init_logger();
    run().await.inspect_err(|err| log::error!("{err}"))
}

async fn run() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let dirs = SessionDirs::from_env()?;
    let config = Config::load(&dirs.config_file());
    let store = SnapshotStore::from_dirs(&dirs);
    let hooks = HookRunner::new(&dirs);
    let comp = HyprCompositor;

    match args.next().as_deref() {
        Some("save") => {
            hooks.run_pre_capture().await;
            let snapshot = capture::capture(&comp, &config, &store).await?;
            println!(
                "Saved {} workspaces, {} windows, {} launch intents",
                snapshot.workspaces.len(),
                snapshot.windows.len(),
                snapshot.applications.len()
            );
            Ok(())
        }
        Some("restore") => {
            let cancel = CancellationToken::new();
            {
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        log::warn!("Cancellation requested, finishing current phase");
                        cancel.cancel();
                    }
                });
            }

            let name = args.next();
            let target = restore::load_target(&store, &config, name.as_deref());
            let report = Orchestrator::with_cancellation(&comp, &config, cancel)
                .run(target)
                .await;
            hooks.run_post_restore().await;
            print!("{report}");

            match report.outcome {
                // Partial item failure is still success at process level.
                RestoreOutcome::Completed => Ok(()),
                RestoreOutcome::Aborted => anyhow::bail!("nothing to restore"),
            }
        }
        Some("status") => {
            status(&store);
            Ok(())
        }
        Some("clean") => {
            let removed = store.prune(config.max_backups)?;
            println!("Removed {removed} old snapshots");
            Ok(())
        }
        _ => {
            eprintln!("{USAGE}");
            anyhow::bail!("missing or unknown subcommand")
        }
    }
}

fn status(store: &SnapshotStore) {
    match store.read_latest() {
        Some(snapshot) => {
            println!("Latest snapshot: {}", snapshot.taken_at);
            println!("  workspaces:    {}", snapshot.workspaces.len());
            println!("  windows:       {}", snapshot.windows.len());
            println!("  launch intents:{}", snapshot.applications.len());
            if let Some(active) = &snapshot.active_workspace {
                println!("  focused:       workspace {} ({})", active.id, active.name);
            }
        }
        None => println!("No structured snapshot"),
    }
    println!("Stored snapshots: {}", store.list().len());
    println!(
        "Legacy mapping: {}",
        if store.legacy_exists() {
            "present"
        } else {
            "absent"
        }
    );
}
