use std::collections::HashMap;

use glam::Vec2;

use crate::layout::LayoutResult;
use crate::tree::NodeId;

/// Positions the user placed by hand. They win over computed layout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManualPositionMap {
    positions: HashMap<NodeId, Vec2>,
}

impl ManualPositionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &NodeId) -> Option<Vec2> {
        self.positions.get(id).copied()
    }

    pub fn set_manual_position(&mut self, id: NodeId, position: Vec2) {
        self.positions.insert(id, position);
    }

    /// Freeze a node where it is currently drawn, so a relayout does not move it.
    /// Returns false when the node is not part of `rendered`.
    pub fn pin(&mut self, id: &NodeId, rendered: &LayoutResult) -> bool {
        match rendered.position_of(id) {
            Some(position) => {
                self.positions.insert(id.clone(), position);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Replace geometry for every node with a stored position. Ids that are
    /// not in the layout are ignored.
    pub fn apply(&self, mut layout: LayoutResult) -> LayoutResult {
        if self.positions.is_empty() {
            return layout;
        }
        for node in &mut layout.nodes {
            if let Some(position) = self.positions.get(&node.id) {
                node.position = *position;
            }
        }
        layout
    }
}
