// SPDX-License-Identifier: MIT OR Apache-2.0
//! Change notification for diagrams and their evaluation state.

use crate::diagram::{Diagram, DiagramId};
use crate::environment::Environment;
use crate::error::DiagramError;
use crate::evaluation::{evaluate_diagram_into, DiagramState};
use crate::executor::Executor;
use std::collections::HashMap;

/// Receives notifications about an observed diagram
pub trait DiagramObserver {
    /// The diagram's nodes or connections changed
    fn model_changed(&mut self, _diagram: DiagramId) {}

    /// A new evaluation state is available
    fn state_changed(&mut self, _diagram: DiagramId, _state: &DiagramState) {}
}

/// Handle returned by [`ObservedDiagrams::observe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

struct Observed {
    observers: Vec<(ObserverId, Box<dyn DiagramObserver>)>,
    state: DiagramState,
}

/// Registry of diagrams with at least one observer.
///
/// Each observed diagram keeps its latest evaluation state, which is reused
/// across passes. A diagram leaves the registry when its last observer does.
#[derive(Default)]
pub struct ObservedDiagrams {
    entries: HashMap<DiagramId, Observed>,
    next_id: u64,
}

impl ObservedDiagrams {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Start observing `diagram`
    pub fn observe(&mut self, diagram: DiagramId, observer: Box<dyn DiagramObserver>) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.entries
            .entry(diagram)
            .or_insert_with(|| Observed {
                observers: Vec::new(),
                state: DiagramState::new(),
            })
            .observers
            .push((id, observer));
        tracing::debug!("Observer {:?} attached to {:?}", id, diagram);
        id
    }

    /// Stop observing; returns the observer if it was registered
    pub fn unobserve(
        &mut self,
        diagram: DiagramId,
        observer: ObserverId,
    ) -> Option<Box<dyn DiagramObserver>> {
        let entry = self.entries.get_mut(&diagram)?;
        let position = entry.observers.iter().position(|(id, _)| *id == observer)?;
        let (_, removed) = entry.observers.remove(position);
        if entry.observers.is_empty() {
            self.entries.remove(&diagram);
            tracing::debug!("{:?} no longer observed", diagram);
        }
        Some(removed)
    }

    /// Check if `diagram` has any observers
    pub fn is_observed(&self, diagram: DiagramId) -> bool {
        self.entries.contains_key(&diagram)
    }

    /// Number of observers attached to `diagram`
    pub fn observer_count(&self, diagram: DiagramId) -> usize {
        self.entries
            .get(&diagram)
            .map_or(0, |entry| entry.observers.len())
    }

    /// Latest evaluation state of an observed diagram
    pub fn state(&self, diagram: DiagramId) -> Option<&DiagramState> {
        self.entries.get(&diagram).map(|entry| &entry.state)
    }

    /// Tell every observer of `diagram` that its model changed
    pub fn notify_model_changed(&mut self, diagram: DiagramId) {
        if let Some(entry) = self.entries.get_mut(&diagram) {
            for (_, observer) in &mut entry.observers {
                observer.model_changed(diagram);
            }
        }
    }

    /// Edit a node's text and notify observers of the change
    pub fn set_node_text(
        &mut self,
        diagram: &mut Diagram,
        index: usize,
        text: &str,
    ) -> Result<(), DiagramError> {
        diagram.set_node_text(index, text)?;
        self.notify_model_changed(diagram.id());
        Ok(())
    }

    /// Re-evaluate an observed diagram and publish the new state.
    ///
    /// Returns `None` without evaluating when nothing observes `diagram`.
    pub fn evaluate(
        &mut self,
        diagram: &Diagram,
        root: &Environment<'_>,
        executor: &mut dyn Executor,
    ) -> Option<&DiagramState> {
        let id = diagram.id();
        let entry = self.entries.get_mut(&id)?;
        evaluate_diagram_into(diagram, root, executor, &mut entry.state);
        for (_, observer) in &mut entry.observers {
            observer.state_changed(id, &entry.state);
        }
        Some(&entry.state)
    }
}
