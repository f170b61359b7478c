// SPDX-License-Identifier: MIT OR Apache-2.0
//! Diagram evaluation.
//!
//! Nodes are evaluated in dependency order by a depth-first walk from every
//! existing node. Errors are collected per line and never stop the pass:
//! a failing statement yields void for its output and evaluation carries on
//! with the rest of the node and the rest of the diagram.

use crate::diagram::Diagram;
use crate::environment::{Environment, ScopeArena};
use crate::error::EvalError;
use crate::executor::Executor;
use crate::node::Node;
use crate::statement::StatementEvaluator;
use crate::value::Any;

/// Result of evaluating one node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeState {
    /// One value per output slot
    pub output_values: Vec<Any>,
    /// One entry per line; empty when the line has no error
    pub line_errors: Vec<String>,
}

impl NodeState {
    /// Check if any line reported an error
    pub fn has_errors(&self) -> bool {
        self.line_errors.iter().any(|error| !error.is_empty())
    }

    /// Get an output value
    pub fn output(&self, index: usize) -> Option<&Any> {
        self.output_values.get(index)
    }
}

/// Outputs and errors of one evaluation pass, indexed by node slot.
///
/// Also owns the assignment scopes allocated during the pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiagramState {
    nodes: Vec<NodeState>,
    scopes: ScopeArena,
}

impl DiagramState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// State of the node in `slot`; deleted slots have an empty state
    pub fn node(&self, slot: usize) -> Option<&NodeState> {
        self.nodes.get(slot)
    }

    /// All node states by slot
    pub fn nodes(&self) -> &[NodeState] {
        &self.nodes
    }

    /// Scopes allocated by assignments during the pass
    pub fn scopes(&self) -> &ScopeArena {
        &self.scopes
    }

    /// Check if any node reported an error
    pub fn has_errors(&self) -> bool {
        self.nodes.iter().any(NodeState::has_errors)
    }

    /// Every non-empty line error as `(slot, line, message)`
    pub fn errors(&self) -> impl Iterator<Item = (usize, usize, &str)> {
        self.nodes.iter().enumerate().flat_map(|(slot, node)| {
            node.line_errors
                .iter()
                .enumerate()
                .filter(|(_, error)| !error.is_empty())
                .map(move |(line, error)| (slot, line, error.as_str()))
        })
    }

    fn reset(&mut self, slot_count: usize) {
        self.nodes.clear();
        self.nodes.resize_with(slot_count, NodeState::default);
        self.scopes.clear();
    }
}

/// Evaluate every node of `diagram` into a fresh state
pub fn evaluate_diagram(
    diagram: &Diagram,
    root: &Environment<'_>,
    executor: &mut dyn Executor,
) -> DiagramState {
    let mut state = DiagramState::new();
    evaluate_diagram_into(diagram, root, executor, &mut state);
    state
}

/// Evaluate every node of `diagram`, reusing `state`
pub fn evaluate_diagram_into(
    diagram: &Diagram,
    root: &Environment<'_>,
    executor: &mut dyn Executor,
    state: &mut DiagramState,
) {
    let slot_count = diagram.node_slot_count();
    state.reset(slot_count);

    let mut pass = Evaluation {
        diagram,
        root,
        executor,
        state,
        marks: vec![Mark::Unvisited; slot_count],
    };
    for index in diagram.existing_node_indices() {
        pass.ensure_evaluated(index);
    }

    tracing::debug!(
        nodes = diagram.node_count(),
        scopes = pass.state.scopes.len(),
        errors = pass.state.errors().count(),
        "Evaluated diagram"
    );
}

/// Traversal state of a node within one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done { cyclic: bool },
}

struct Evaluation<'a, 'e> {
    diagram: &'a Diagram,
    root: &'a Environment<'e>,
    executor: &'a mut dyn Executor,
    state: &'a mut DiagramState,
    marks: Vec<Mark>,
}

/// A node on the walk stack and the next of its inputs to follow
struct Frame {
    node: usize,
    next_input: usize,
    cyclic: bool,
}

impl Evaluation<'_, '_> {
    /// Evaluate `start` after all of its sources.
    ///
    /// The walk keeps its own stack, so long dependency chains do not grow
    /// the call stack. A node is cyclic when it lies on a cycle or depends
    /// on a cyclic node.
    fn ensure_evaluated(&mut self, start: usize) {
        let diagram = self.diagram;
        if self.marks[start] != Mark::Unvisited || diagram.node(start).is_none() {
            return;
        }

        self.marks[start] = Mark::Visiting;
        let mut stack = vec![Frame {
            node: start,
            next_input: 0,
            cyclic: false,
        }];

        while let Some(frame) = stack.last_mut() {
            let index = frame.node;
            let Some(node) = diagram.node(index) else {
                stack.pop();
                continue;
            };

            if let Some(input) = node.inputs().get(frame.next_input) {
                frame.next_input += 1;
                let Some(source) = input.source else {
                    continue;
                };
                if diagram.node(source.node).is_none() {
                    continue;
                }
                match self.marks[source.node] {
                    Mark::Visiting => frame.cyclic = true,
                    Mark::Done { cyclic } => frame.cyclic |= cyclic,
                    Mark::Unvisited => {
                        self.marks[source.node] = Mark::Visiting;
                        stack.push(Frame {
                            node: source.node,
                            next_input: 0,
                            cyclic: false,
                        });
                    }
                }
                continue;
            }

            let cyclic = frame.cyclic;
            stack.pop();
            let result = if cyclic {
                tracing::debug!(node = index, "Node is part of a dependency cycle");
                cyclic_node_state(node)
            } else {
                self.run_node(node)
            };
            self.state.nodes[index] = result;
            self.marks[index] = Mark::Done { cyclic };
            if let Some(parent) = stack.last_mut() {
                parent.cyclic |= cyclic;
            }
        }
    }

    fn run_node(&mut self, node: &Node) -> NodeState {
        let inputs: Vec<Any> = node
            .inputs()
            .iter()
            .map(|input| {
                input
                    .source
                    .and_then(|source| {
                        self.state
                            .nodes
                            .get(source.node)?
                            .output_values
                            .get(source.output)
                            .cloned()
                    })
                    .unwrap_or_default()
            })
            .collect();

        let mut result = NodeState {
            output_values: Vec::with_capacity(node.output_count()),
            line_errors: vec![String::new(); node.lines().len()],
        };
        let mut statements = StatementEvaluator::new(self.root, &mut self.state.scopes, inputs);
        let mut first_input = 0;

        for (index, statement) in node.statements().iter().enumerate() {
            let lines = node.statement_line_range(index);
            let text = node.statement_text(index);
            statements.seek_input(first_input);
            first_input += node.lines()[lines.clone()]
                .iter()
                .map(|line| line.n_inputs)
                .sum::<usize>();

            let outcome = if text.trim().is_empty() {
                Ok(Any::Void)
            } else {
                statements.evaluate(&text, &mut *self.executor)
            };

            let value = match outcome {
                Ok(value) => value,
                Err(error) => {
                    let message = error.to_string();
                    for line in lines {
                        result.line_errors[line].clone_from(&message);
                    }
                    Any::Void
                }
            };
            if statement.has_output {
                result.output_values.push(value);
            }
        }
        result
    }
}

fn cyclic_node_state(node: &Node) -> NodeState {
    NodeState {
        output_values: vec![Any::Void; node.output_count()],
        line_errors: vec![EvalError::CyclicDependency.to_string(); node.lines().len()],
    }
}
