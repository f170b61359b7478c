// SPDX-License-Identifier: MIT OR Apache-2.0
//! Diagram nodes: text boxes whose shape (statements, inputs, outputs) is
//! derived from their text.

use crate::text;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// One line of node text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    /// Raw text without the newline
    pub text: String,
    /// Number of `$` placeholders on the line
    pub n_inputs: usize,
}

/// A group of lines evaluated as a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    /// Number of lines in the statement
    pub n_lines: usize,
    /// Whether the statement feeds an output slot
    pub has_output: bool,
}

/// Where an input takes its value from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputSource {
    /// Slot index of the source node
    pub node: usize,
    /// Output index on the source node
    pub output: usize,
}

/// Input slot; the i-th `$` of the text reads input i
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Input {
    /// Connected source, if any
    pub source: Option<InputSource>,
}

impl Input {
    /// Check if the input is wired to a source
    pub fn is_connected(&self) -> bool {
        self.source.is_some()
    }
}

/// Output slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    /// Index of the statement producing this output
    pub statement: usize,
}

/// A node instance in a diagram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Position in the editor
    pub position: [f32; 2],
    lines: Vec<Line>,
    statements: Vec<Statement>,
    inputs: Vec<Input>,
    outputs: Vec<Output>,
}

impl Node {
    /// Create a node holding `text`
    pub fn new(text: &str) -> Self {
        let mut node = Self {
            position: [0.0, 0.0],
            lines: Vec::new(),
            statements: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        };
        node.set_text(text);
        node
    }

    /// Set the position
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = [x, y];
        self
    }

    /// Replace the text and recompute statements, inputs and outputs.
    ///
    /// A statement that already had an output keeps it while its text is
    /// blank or an assignment still missing its value, so wires survive
    /// half-typed edits.
    pub fn set_text(&mut self, text: &str) {
        let raw_lines = text::split_lines(text);
        let groups = text::group_statements(&raw_lines);

        let mut statements = Vec::with_capacity(groups.len());
        let mut first_line = 0;
        for (index, n_lines) in groups.into_iter().enumerate() {
            let joined = raw_lines[first_line..first_line + n_lines].join("\n");
            let had_output = self
                .statements
                .get(index)
                .is_some_and(|previous| previous.has_output);
            let sticky = had_output
                && (joined.trim().is_empty() || text::is_incomplete_assignment(&joined));
            statements.push(Statement {
                n_lines,
                has_output: sticky || text::statement_has_output(&joined),
            });
            first_line += n_lines;
        }

        self.lines = raw_lines
            .into_iter()
            .map(|line| Line {
                text: line.to_string(),
                n_inputs: text::count_inputs(line),
            })
            .collect();
        self.statements = statements;
        self.update_inputs_and_outputs();
    }

    /// Resize inputs and outputs to match the current text.
    ///
    /// Inputs are positional: existing connections stay on the same index
    /// even if the `$` they fed moved.
    pub fn update_inputs_and_outputs(&mut self) {
        let n_inputs = self.lines.iter().map(|line| line.n_inputs).sum();
        self.inputs.resize(n_inputs, Input::default());

        self.outputs = self
            .statements
            .iter()
            .enumerate()
            .filter(|(_, statement)| statement.has_output)
            .map(|(statement, _)| Output { statement })
            .collect();
    }

    /// Statements holding an output only because of the sticky rule
    pub fn sticky_outputs(&self) -> Vec<usize> {
        (0..self.statements.len())
            .filter(|&index| {
                self.statements[index].has_output
                    && !text::statement_has_output(&self.statement_text(index))
            })
            .collect()
    }

    /// Restore a sticky output on `statement`.
    ///
    /// Only blank statements and incomplete assignments can hold one;
    /// returns false for any other statement.
    pub fn keep_output(&mut self, statement: usize) -> bool {
        if statement >= self.statements.len() {
            return false;
        }
        let text = self.statement_text(statement);
        if !(text.trim().is_empty() || text::is_incomplete_assignment(&text)) {
            return false;
        }
        self.statements[statement].has_output = true;
        self.update_inputs_and_outputs();
        true
    }

    /// Full text with lines joined by newlines
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Lines of text
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Statements in line order
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Range of line indices covered by a statement
    pub fn statement_line_range(&self, statement: usize) -> Range<usize> {
        let start: usize = self.statements[..statement]
            .iter()
            .map(|s| s.n_lines)
            .sum();
        start..start + self.statements[statement].n_lines
    }

    /// Text of a statement, its lines joined by newlines
    pub fn statement_text(&self, statement: usize) -> String {
        self.lines[self.statement_line_range(statement)]
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Input slots
    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    /// Get an input by index
    pub fn input(&self, index: usize) -> Option<&Input> {
        self.inputs.get(index)
    }

    pub(crate) fn input_mut(&mut self, index: usize) -> Option<&mut Input> {
        self.inputs.get_mut(index)
    }

    pub(crate) fn inputs_mut(&mut self) -> impl Iterator<Item = &mut Input> {
        self.inputs.iter_mut()
    }

    /// Output slots
    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    /// Number of outputs
    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_from_text() {
        let node = Node::new("a = $\nb = $ * $\na + b\nreturn a");
        assert_eq!(node.lines().len(), 4);
        assert_eq!(node.statements().len(), 4);
        assert_eq!(node.inputs().len(), 3);
        assert_eq!(node.output_count(), 2);
        assert_eq!(node.outputs()[0].statement, 2);
        assert_eq!(node.outputs()[1].statement, 3);
    }

    #[test]
    fn test_multiline_statement() {
        let node = Node::new("[$,\n $]\nx = 1");
        assert_eq!(node.statements().len(), 2);
        assert_eq!(node.statement_line_range(0), 0..2);
        assert_eq!(node.statement_line_range(1), 2..3);
        assert_eq!(node.statement_text(0), "[$,\n $]");
        assert_eq!(node.inputs().len(), 2);
        assert_eq!(node.output_count(), 1);
    }

    #[test]
    fn test_empty_node() {
        let node = Node::default();
        assert_eq!(node.lines().len(), 1);
        assert_eq!(node.output_count(), 0);
        assert_eq!(node.text(), "");
    }

    #[test]
    fn test_output_sticks_while_typing_assignment() {
        let mut node = Node::new("x");
        assert_eq!(node.output_count(), 1);

        node.set_text("x =");
        assert_eq!(node.output_count(), 1);

        node.set_text("");
        assert_eq!(node.output_count(), 1);

        node.set_text("x = 5");
        assert_eq!(node.output_count(), 0);

        // Once retracted, a blank statement does not regain the output.
        node.set_text("");
        assert_eq!(node.output_count(), 0);
    }

    #[test]
    fn test_keep_output() {
        let mut node = Node::new("x\na = 1");
        node.set_text("x =\na = 1");
        assert_eq!(node.sticky_outputs(), vec![0]);

        let mut fresh = Node::new("x =\na = 1");
        assert_eq!(fresh.output_count(), 0);
        assert!(!fresh.keep_output(1));
        assert!(!fresh.keep_output(7));
        assert!(fresh.keep_output(0));
        assert_eq!(fresh, node);
    }

    #[test]
    fn test_inputs_remap_by_position() {
        let mut node = Node::new("$ + $");
        node.input_mut(1).unwrap().source = Some(InputSource { node: 4, output: 0 });

        node.set_text("$");
        assert_eq!(node.inputs().len(), 1);

        node.set_text("$ - $");
        assert_eq!(node.inputs().len(), 2);
        // Connection on slot 1 was dropped when the slot disappeared.
        assert!(!node.inputs()[1].is_connected());

        node.input_mut(0).unwrap().source = Some(InputSource { node: 2, output: 1 });
        node.set_text("1 + $ + $");
        assert_eq!(node.inputs()[0].source, Some(InputSource { node: 2, output: 1 }));
    }

    #[test]
    fn test_text_round_trip() {
        let node = Node::new("a\n\nb");
        assert_eq!(node.text(), "a\n\nb");
    }
}
