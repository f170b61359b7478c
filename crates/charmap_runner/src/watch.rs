// SPDX-License-Identifier: MIT OR Apache-2.0
//! Live re-evaluation of a diagram file.

use crate::bindings::build_environment;
use crate::config::RunnerConfig;
use crate::error::RunnerError;
use crate::file_watcher::{FileEvent, FileWatcher, FileWatcherConfig};
use crate::report::RunReport;
use crate::{executor_for, read_diagram};
use charmap_diagram::{DiagramId, DiagramObserver, DiagramState, ObservedDiagrams, ReturnExecutor};
use std::path::{Path, PathBuf};

/// Prints every new evaluation state to stdout
pub struct ConsoleObserver {
    path: PathBuf,
    passes: usize,
}

impl ConsoleObserver {
    /// Create an observer labelling output with `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            passes: 0,
        }
    }
}

impl DiagramObserver for ConsoleObserver {
    fn model_changed(&mut self, _diagram: DiagramId) {
        tracing::info!("{} changed", self.path.display());
    }

    fn state_changed(&mut self, _diagram: DiagramId, state: &DiagramState) {
        self.passes += 1;
        let report = RunReport::from_state(state);
        println!("--- {} (pass {}) ---", self.path.display(), self.passes);
        print!("{report}");
        if report.error_count() > 0 {
            tracing::warn!("{} line(s) failed", report.error_count());
        }
    }
}

/// Evaluate `file` now and again after every change until the watcher stops
pub fn watch(file: &Path, config: &RunnerConfig, expect: Option<String>) -> Result<(), RunnerError> {
    let root = build_environment(config);
    let mut executor = executor_for(expect.or_else(|| config.expected_return_type.clone()));
    let mut diagram = read_diagram(file)?;

    let mut observed = ObservedDiagrams::new();
    observed.observe(diagram.id(), Box::new(ConsoleObserver::new(file)));
    observed.evaluate(&diagram, &root, &mut executor);
    print_executor(&executor);

    let mut watcher = FileWatcher::new(&FileWatcherConfig::with_debounce_ms(config.watch.debounce_ms))?;
    watcher.watch_file(file)?;

    while let Some(event) = watcher.next_event() {
        match event {
            FileEvent::Modified(path) => {
                let reloaded = match read_diagram(&path) {
                    Ok(reloaded) => reloaded,
                    Err(err) => {
                        tracing::error!("{err}");
                        continue;
                    }
                };
                diagram.replace_nodes(reloaded);
                observed.notify_model_changed(diagram.id());
                executor.reset();
                observed.evaluate(&diagram, &root, &mut executor);
                print_executor(&executor);
            }
            FileEvent::Deleted(path) => {
                tracing::warn!("{} was deleted; keeping the last loaded diagram", path.display());
            }
            FileEvent::Error(message) => tracing::warn!("File watcher: {message}"),
        }
    }
    Ok(())
}

fn print_executor(executor: &ReturnExecutor) {
    for value in executor.shown() {
        println!("show: {value}");
    }
    if let Some(value) = executor.return_value() {
        println!("return: {value}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charmap_diagram::{Diagram, Environment};

    #[test]
    fn test_console_observer_follows_edits() {
        let mut diagram = Diagram::new();
        let node = diagram.add_node("1 + 2");
        let mut observed = ObservedDiagrams::new();
        let id = observed.observe(diagram.id(), Box::new(ConsoleObserver::new("test.diagram")));

        let root = Environment::new();
        let mut executor = ReturnExecutor::new();
        observed.evaluate(&diagram, &root, &mut executor);
        observed.set_node_text(&mut diagram, node, "(").unwrap();
        let state = observed.evaluate(&diagram, &root, &mut executor).unwrap();
        assert!(state.has_errors());

        assert!(observed.unobserve(diagram.id(), id).is_some());
        assert!(!observed.is_observed(diagram.id()));
    }
}
