// SPDX-License-Identifier: MIT OR Apache-2.0
//! Evaluation reports in text and JSON form.

use charmap_diagram::{DiagramState, ReturnExecutor};
use serde::Serialize;
use std::fmt;

/// Error recorded against one line of a node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineError {
    /// Line number within the node, 1-based
    pub line: usize,
    /// Diagnostic text
    pub message: String,
}

/// Outputs and errors of one node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeReport {
    /// Node id as saved, slot index + 1
    pub id: usize,
    /// Output values, formatted
    pub outputs: Vec<String>,
    /// Lines that failed
    pub errors: Vec<LineError>,
}

/// Result of evaluating a diagram
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    /// Every existing node in slot order
    pub nodes: Vec<NodeReport>,
    /// Values passed to `show`, formatted
    pub shown: Vec<String>,
    /// The returned value, formatted
    pub return_value: Option<String>,
}

impl RunReport {
    /// Summarize an evaluation state.
    ///
    /// Deleted slots carry no line entries and are left out.
    pub fn from_state(state: &DiagramState) -> Self {
        let nodes = state
            .nodes()
            .iter()
            .enumerate()
            .filter(|(_, node)| !node.line_errors.is_empty())
            .map(|(slot, node)| NodeReport {
                id: slot + 1,
                outputs: node.output_values.iter().map(ToString::to_string).collect(),
                errors: node
                    .line_errors
                    .iter()
                    .enumerate()
                    .filter(|(_, message)| !message.is_empty())
                    .map(|(line, message)| LineError {
                        line: line + 1,
                        message: message.clone(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            nodes,
            ..Self::default()
        }
    }

    /// Add what the executor saw during the pass
    pub fn with_executor(mut self, executor: &ReturnExecutor) -> Self {
        self.shown = executor.shown().iter().map(ToString::to_string).collect();
        self.return_value = executor.return_value().map(ToString::to_string);
        self
    }

    /// Total number of failed lines
    pub fn error_count(&self) -> usize {
        self.nodes.iter().map(|node| node.errors.len()).sum()
    }

    /// Encode as pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            writeln!(f, "node {}", node.id)?;
            for (index, output) in node.outputs.iter().enumerate() {
                writeln!(f, "  out {index}: {output}")?;
            }
            for error in &node.errors {
                writeln!(f, "  line {}: error: {}", error.line, error.message)?;
            }
        }
        for value in &self.shown {
            writeln!(f, "show: {value}")?;
        }
        if let Some(value) = &self.return_value {
            writeln!(f, "return: {value}")?;
        }
        Ok(())
    }
}
