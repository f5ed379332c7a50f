//! Calibration file watcher. A notify watcher thread forwards change events
//! over a channel; the frame loop drains the channel at frame boundaries and
//! reloads the profile wholesale, so a reload never races an in-flight
//! composite.

use std::path::{Path, PathBuf};

use crossbeam_channel::Sender;
use notify::{
    Event, EventKind, RecommendedWatcher, RecursiveMode, Result as NotifyResult, Watcher,
    event::{CreateKind, ModifyKind},
};
use tracing::warn;

#[derive(Clone, Debug)]
pub struct CalibrationChanged;

/// Watch the directory containing the calibration file and emit one event per
/// create/modify of that file. Returns the watcher handle; dropping it stops
/// the watch.
pub fn start_watcher(
    calibration_path: &Path,
    tx: Sender<CalibrationChanged>,
) -> NotifyResult<RecommendedWatcher> {
    let file_name = calibration_path
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_default();
    let dir = calibration_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => handle_event(event, &file_name, &tx),
        Err(err) => warn!(%err, "calibration watch error"),
    })?;

    watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

fn handle_event(event: Event, file_name: &Path, tx: &Sender<CalibrationChanged>) {
    let relevant = match &event.kind {
        EventKind::Create(CreateKind::File) => true,
        EventKind::Modify(ModifyKind::Data(_)) => true,
        EventKind::Modify(ModifyKind::Name(_)) => true,
        _ => false,
    };
    if !relevant {
        return;
    }
    if event
        .paths
        .iter()
        .any(|p| p.file_name().map(PathBuf::from).as_deref() == Some(file_name))
    {
        let _ = tx.send(CalibrationChanged);
    }
}
