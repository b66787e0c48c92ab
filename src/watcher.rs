use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};

use crate::names::NameTable;

/// Keeps a [`NameTable`] in sync with its backing file for as long as it lives.
pub struct NameWatcher {
    _watcher: RecommendedWatcher,
}

impl NameWatcher {
    pub fn new(names: Arc<NameTable>) -> anyhow::Result<Self> {
        let path = names.path().to_owned();
        let file_name = path
            .file_name()
            .with_context(|| format!("'{}' does not name a file", path.display()))?
            .to_owned();

        // Watch the directory so deletes and renames of the file are still seen.
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_owned(),
            _ => Path::new(".").to_owned(),
        };

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let touches_file = event
                    .paths
                    .iter()
                    .any(|p| p.file_name() == Some(file_name.as_os_str()));

                if touches_file && is_change(&event.kind) {
                    log::debug!("Desktop names file changed ({:?})", event.kind);
                    if let Err(e) = names.load() {
                        log::warn!("{e:#}");
                    }
                }
            }
            Err(e) => log::error!("Desktop names watch error: {e}"),
        })
        .context("Failed to create file watcher")?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch '{}'", dir.display()))?;

        log::info!("Watching '{}' for desktop names", path.display());

        Ok(Self { _watcher: watcher })
    }
}

/// Created, modified, deleted and renamed all mean the same thing here.
fn is_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_)
            | EventKind::Remove(_)
            | EventKind::Modify(
                ModifyKind::Data(_) | ModifyKind::Name(_) | ModifyKind::Any | ModifyKind::Other
            )
    )
}
