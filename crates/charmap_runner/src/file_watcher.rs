// SPDX-License-Identifier: MIT OR Apache-2.0
//! Debounced watching of diagram files.
//!
//! Editors often save by writing a new file and renaming it over the old
//! one, so the watcher observes each file's parent directory and filters
//! events down to the watched paths.

use notify_debouncer_full::{
    new_debouncer,
    notify::{self, EventKind, RecommendedWatcher, RecursiveMode},
    DebounceEventResult, Debouncer, RecommendedCache,
};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::time::Duration;

/// Events emitted by the file watcher
#[derive(Debug, Clone, PartialEq)]
pub enum FileEvent {
    /// A watched file was created or modified
    Modified(PathBuf),
    /// A watched file was deleted
    Deleted(PathBuf),
    /// The watcher reported an error
    Error(String),
}

/// Configuration for the file watcher
#[derive(Debug, Clone)]
pub struct FileWatcherConfig {
    /// Debounce duration for events
    pub debounce_duration: Duration,
}

impl Default for FileWatcherConfig {
    fn default() -> Self {
        Self {
            debounce_duration: Duration::from_millis(250),
        }
    }
}

impl FileWatcherConfig {
    /// Create a config with the given debounce window in milliseconds
    pub fn with_debounce_ms(debounce_ms: u64) -> Self {
        Self {
            debounce_duration: Duration::from_millis(debounce_ms),
        }
    }
}

/// Watches individual files for changes
pub struct FileWatcher {
    debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
    event_rx: Receiver<FileEvent>,
    watched_files: Arc<RwLock<HashSet<PathBuf>>>,
    watched_dirs: HashSet<PathBuf>,
}

impl FileWatcher {
    /// Create a new file watcher with the given configuration
    pub fn new(config: &FileWatcherConfig) -> Result<Self, notify::Error> {
        let (event_tx, event_rx) = mpsc::channel();
        let watched_files = Arc::new(RwLock::new(HashSet::new()));
        let filter = Arc::clone(&watched_files);

        let debouncer = new_debouncer(
            config.debounce_duration,
            None,
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    let watched = filter.read();
                    for event in events {
                        for path in event.paths.iter().filter(|p| watched.contains(*p)) {
                            let file_event = match event.kind {
                                EventKind::Create(_) | EventKind::Modify(_) => {
                                    FileEvent::Modified(path.clone())
                                }
                                EventKind::Remove(_) => FileEvent::Deleted(path.clone()),
                                EventKind::Any | EventKind::Access(_) | EventKind::Other => {
                                    continue
                                }
                            };
                            let _ = event_tx.send(file_event);
                        }
                    }
                }
                Err(errors) => {
                    for error in errors {
                        let _ = event_tx.send(FileEvent::Error(error.to_string()));
                    }
                }
            },
        )?;

        Ok(Self {
            debouncer,
            event_rx,
            watched_files,
            watched_dirs: HashSet::new(),
        })
    }

    /// Watch a file for changes
    pub fn watch_file(&mut self, path: impl AsRef<Path>) -> Result<(), notify::Error> {
        let path = std::fs::canonicalize(path.as_ref())?;
        let dir = path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

        if !self.watched_dirs.contains(&dir) {
            self.debouncer.watch(&dir, RecursiveMode::NonRecursive)?;
            self.watched_dirs.insert(dir);
        }
        tracing::info!("Watching {} for changes", path.display());
        self.watched_files.write().insert(path);
        Ok(())
    }

    /// Block until the next event; `None` once the watcher has shut down
    pub fn next_event(&self) -> Option<FileEvent> {
        self.event_rx.recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = FileWatcherConfig::default();
        assert_eq!(config.debounce_duration, Duration::from_millis(250));
        assert_eq!(
            FileWatcherConfig::with_debounce_ms(40).debounce_duration,
            Duration::from_millis(40)
        );
    }

    #[test]
    fn test_watch_file() {
        let dir = std::env::temp_dir().join(format!("charmap-watch-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("graph.diagram");
        let other = dir.join("other.diagram");
        std::fs::write(&file, "diagram {}").unwrap();
        std::fs::write(&other, "diagram {}").unwrap();

        let mut watcher = FileWatcher::new(&FileWatcherConfig::default()).unwrap();
        watcher.watch_file(&file).unwrap();
        watcher.watch_file(&other).unwrap();
        watcher.watch_file(&file).unwrap();
        assert_eq!(watcher.watched_files.read().len(), 2);
        assert_eq!(watcher.watched_dirs.len(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let mut watcher = FileWatcher::new(&FileWatcherConfig::default()).unwrap();
        assert!(watcher.watch_file("/nonexistent/charmap/graph.diagram").is_err());
    }
}
