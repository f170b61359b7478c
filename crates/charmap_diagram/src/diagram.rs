// SPDX-License-Identifier: MIT OR Apache-2.0
//! Diagram: slot array of nodes wired output-to-input.

use crate::error::DiagramError;
use crate::node::{InputSource, Node};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of a diagram, stable for its lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiagramId(pub Uuid);

impl DiagramId {
    /// Create a new random diagram ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DiagramId {
    fn default() -> Self {
        Self::new()
    }
}

/// A node graph.
///
/// Node indices are slot positions: they stay valid until the node is
/// deleted and are never reused implicitly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagram {
    id: DiagramId,
    nodes: Vec<Option<Node>>,
}

impl Diagram {
    /// Create an empty diagram
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity used to key observers and cached state
    pub fn id(&self) -> DiagramId {
        self.id
    }

    /// Append a node holding `text`, returning its index
    pub fn add_node(&mut self, text: &str) -> usize {
        self.push_node(Node::new(text))
    }

    /// Append a prepared node, returning its index
    pub fn push_node(&mut self, node: Node) -> usize {
        self.nodes.push(Some(node));
        self.nodes.len() - 1
    }

    /// Place a node at an explicit slot, growing storage as needed
    pub fn create_or_replace_node(&mut self, index: usize, node: Node) {
        if index >= self.nodes.len() {
            self.nodes.resize_with(index + 1, || None);
        }
        self.nodes[index] = Some(node);
    }

    /// Take every node from `other`, keeping this diagram's identity
    pub fn replace_nodes(&mut self, other: Diagram) {
        self.nodes = other.nodes;
    }

    /// Remove a node and disconnect every input that read from it
    pub fn delete_node(&mut self, index: usize) -> Result<Node, DiagramError> {
        let node = self
            .nodes
            .get_mut(index)
            .and_then(Option::take)
            .ok_or(DiagramError::NodeNotFound(index))?;

        for other in self.nodes.iter_mut().flatten() {
            for input in other.inputs_mut() {
                if input.source.is_some_and(|source| source.node == index) {
                    input.source = None;
                }
            }
        }
        Ok(node)
    }

    /// Wire an output to an input, replacing any existing connection.
    ///
    /// Cycles are not rejected here; evaluation reports them per node.
    pub fn connect_nodes(
        &mut self,
        output_node: usize,
        output_index: usize,
        input_node: usize,
        input_index: usize,
    ) -> Result<(), DiagramError> {
        let source = self.node(output_node).ok_or(DiagramError::NodeNotFound(output_node))?;
        if output_index >= source.output_count() {
            return Err(DiagramError::OutputOutOfRange {
                node: output_node,
                output: output_index,
            });
        }

        let target = self.node_mut(input_node)?;
        let input = target
            .input_mut(input_index)
            .ok_or(DiagramError::InputOutOfRange {
                node: input_node,
                input: input_index,
            })?;
        input.source = Some(InputSource {
            node: output_node,
            output: output_index,
        });
        Ok(())
    }

    /// Clear an input's connection, returning the previous source
    pub fn disconnect_input(
        &mut self,
        node: usize,
        input_index: usize,
    ) -> Result<Option<InputSource>, DiagramError> {
        let input = self
            .node_mut(node)?
            .input_mut(input_index)
            .ok_or(DiagramError::InputOutOfRange {
                node,
                input: input_index,
            })?;
        Ok(input.source.take())
    }

    /// Replace a node's text, then drop connections that no longer fit
    pub fn set_node_text(&mut self, index: usize, text: &str) -> Result<(), DiagramError> {
        self.node_mut(index)?.set_text(text);
        self.remove_invalid_inputs();
        Ok(())
    }

    /// Move a node in the editor
    pub fn set_node_position(&mut self, index: usize, x: f32, y: f32) -> Result<(), DiagramError> {
        self.node_mut(index)?.position = [x, y];
        Ok(())
    }

    /// Disconnect inputs whose source node or output no longer exists
    pub fn remove_invalid_inputs(&mut self) {
        let output_counts: Vec<Option<usize>> = self
            .nodes
            .iter()
            .map(|slot| slot.as_ref().map(Node::output_count))
            .collect();

        for node in self.nodes.iter_mut().flatten() {
            for input in node.inputs_mut() {
                let Some(source) = input.source else {
                    continue;
                };
                let valid = output_counts
                    .get(source.node)
                    .copied()
                    .flatten()
                    .is_some_and(|count| source.output < count);
                if !valid {
                    input.source = None;
                }
            }
        }
    }

    /// Get a node by index
    pub fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, index: usize) -> Result<&mut Node, DiagramError> {
        self.nodes
            .get_mut(index)
            .and_then(Option::as_mut)
            .ok_or(DiagramError::NodeNotFound(index))
    }

    /// Indices of occupied slots in ascending order
    pub fn existing_node_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.existing_nodes().map(|(index, _)| index)
    }

    /// Occupied slots with their nodes in ascending order
    pub fn existing_nodes(&self) -> impl Iterator<Item = (usize, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|node| (index, node)))
    }

    /// Number of slots, including deleted ones
    pub fn node_slot_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of existing nodes
    pub fn node_count(&self) -> usize {
        self.nodes.iter().flatten().count()
    }
}

/// Diagrams are equal when they hold the same nodes at the same slots;
/// identity is not compared.
impl PartialEq for Diagram {
    fn eq(&self, other: &Self) -> bool {
        self.existing_nodes().eq(other.existing_nodes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> Diagram {
        let mut diagram = Diagram::new();
        let a = diagram.add_node("1\n2");
        let b = diagram.add_node("$ + $");
        diagram.connect_nodes(a, 0, b, 0).unwrap();
        diagram.connect_nodes(a, 1, b, 1).unwrap();
        diagram
    }

    #[test]
    fn test_add_and_connect() {
        let diagram = chain();
        assert_eq!(diagram.node_count(), 2);
        assert_eq!(
            diagram.node(1).unwrap().inputs()[1].source,
            Some(InputSource { node: 0, output: 1 })
        );
    }

    #[test]
    fn test_connect_validates_ranges() {
        let mut diagram = chain();
        assert_eq!(
            diagram.connect_nodes(0, 2, 1, 0),
            Err(DiagramError::OutputOutOfRange { node: 0, output: 2 })
        );
        assert_eq!(
            diagram.connect_nodes(0, 0, 1, 5),
            Err(DiagramError::InputOutOfRange { node: 1, input: 5 })
        );
        assert_eq!(diagram.connect_nodes(7, 0, 1, 0), Err(DiagramError::NodeNotFound(7)));
    }

    #[test]
    fn test_delete_clears_dependents() {
        let mut diagram = chain();
        diagram.delete_node(0).unwrap();

        assert!(diagram.node(0).is_none());
        assert_eq!(diagram.node_slot_count(), 2);
        assert!(diagram.node(1).unwrap().inputs().iter().all(|i| !i.is_connected()));
        assert_eq!(diagram.existing_node_indices().collect::<Vec<_>>(), vec![1]);
        assert_eq!(diagram.delete_node(0), Err(DiagramError::NodeNotFound(0)));
    }

    #[test]
    fn test_indices_are_not_reused() {
        let mut diagram = chain();
        diagram.delete_node(0).unwrap();
        assert_eq!(diagram.add_node("3"), 2);
    }

    #[test]
    fn test_text_edit_prunes_stale_outputs() {
        let mut diagram = chain();
        diagram.set_node_text(0, "1").unwrap();

        let inputs = diagram.node(1).unwrap().inputs();
        assert!(inputs[0].is_connected());
        assert!(!inputs[1].is_connected());
    }

    #[test]
    fn test_create_or_replace_grows() {
        let mut diagram = Diagram::new();
        diagram.create_or_replace_node(3, Node::new("5"));
        assert_eq!(diagram.node_slot_count(), 4);
        assert_eq!(diagram.existing_node_indices().collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn test_disconnect_input() {
        let mut diagram = chain();
        assert_eq!(
            diagram.disconnect_input(1, 0),
            Ok(Some(InputSource { node: 0, output: 0 }))
        );
        assert_eq!(diagram.disconnect_input(1, 0), Ok(None));
    }

    #[test]
    fn test_serialization() {
        let diagram = chain();
        let ron_str = ron::ser::to_string_pretty(&diagram, ron::ser::PrettyConfig::default()).unwrap();
        let loaded: Diagram = ron::from_str(&ron_str).unwrap();
        assert_eq!(loaded, diagram);
        assert_eq!(loaded.id(), diagram.id());
    }

    #[test]
    fn test_replace_nodes_keeps_identity() {
        let mut diagram = Diagram::new();
        diagram.add_node("1");
        let id = diagram.id();

        diagram.replace_nodes(chain());
        assert_eq!(diagram.id(), id);
        assert_eq!(diagram, chain());
    }
}
