use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use notify::{EventKind, RecursiveMode};
use notify_debouncer_full::{DebouncedEvent, new_debouncer};

use crate::Site;
use crate::error::{SiteError, WatchError};

/// Builds `site`, then rebuilds it whenever something in the source tree
/// changes. Changes below the destination are ignored. Only returns on error.
///
/// Failed rebuilds are logged and the loop keeps going, only the initial
/// build has to succeed.
pub fn watch(site: &mut Site) -> Result<(), SiteError> {
    tracing::info!(
        "Running {} in {} mode.",
        console::style("kasane").red(),
        console::style("watch").blue()
    );

    site.process()?;

    Ok(watch_loop(site)?)
}

fn watch_loop(site: &mut Site) -> Result<(), WatchError> {
    let source = site.config().source.canonicalize()?;

    let (tx, rx) = mpsc::channel();
    let mut debouncer = new_debouncer(Duration::from_millis(250), None, tx)?;
    debouncer.watch(&source, RecursiveMode::Recursive)?;

    loop {
        let events = match rx.recv()? {
            Ok(events) => events,
            Err(errors) => {
                for error in errors {
                    tracing::warn!("watch error: {error}");
                }
                continue;
            }
        };

        // the destination may not have existed before the first build
        let dest = site.config().destination.canonicalize().ok();

        if !affects_site(&events, dest.as_deref()) {
            continue;
        }

        let start = Instant::now();
        match site.process() {
            Ok(()) => tracing::info!("Refreshed in {:?}", start.elapsed()),
            Err(e) => tracing::error!("Encountered an error while rebuilding: {e}"),
        }
    }
}

/// Whether any of the events touches something outside the destination.
fn affects_site(events: &[DebouncedEvent], dest: Option<&Path>) -> bool {
    events
        .iter()
        .filter(|de| {
            matches!(
                de.event.kind,
                EventKind::Create(..) | EventKind::Modify(..) | EventKind::Remove(..)
            )
        })
        .flat_map(|de| &de.event.paths)
        .any(|path: &PathBuf| dest.is_none_or(|dest| !path.starts_with(dest)))
}
