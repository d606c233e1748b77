use glam::Vec2;
use tracing::debug;

use crate::canvas::Rect;
use crate::config::LayoutConfig;
pub use crate::config::snap_to_grid;
use crate::expand_state::ExpansionState;
use crate::tree::{NodeId, TreeNode};

/// A node placed by the layout pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedNode {
    pub id: NodeId,
    /// Top-left corner in world space.
    pub position: Vec2,
    pub size: Vec2,
    pub depth: usize,
    pub label: String,
    pub child_count: usize,
    /// True when this node's children were laid out below it.
    pub expanded: bool,
}

impl PositionedNode {
    pub fn rect(&self) -> Rect {
        Rect::new(self.position.x, self.position.y, self.size.x, self.size.y)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub id: String,
    pub source: NodeId,
    pub target: NodeId,
}

impl Edge {
    pub fn new(source: NodeId, target: NodeId) -> Self {
        Self {
            id: format!("{}->{}", source, target),
            source,
            target,
        }
    }
}

/// Nodes in render order (pre-order) plus the parent→child edges between them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutResult {
    pub nodes: Vec<PositionedNode>,
    pub edges: Vec<Edge>,
}

impl LayoutResult {
    pub fn get(&self, id: &NodeId) -> Option<&PositionedNode> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn position_of(&self, id: &NodeId) -> Option<Vec2> {
        self.get(id).map(|n| n.position)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.get(id).is_some()
    }
}

/// Rank-layered layout: depth runs along x, siblings stack along y.
///
/// The root is always open. An open node lays its children out one column
/// to the right, each taking the next free row; a closed child is placed as
/// a stub and its own children are skipped. Every coordinate is snapped to
/// the config's grid.
pub fn layout(tree: &TreeNode, expansion: &ExpansionState, config: &LayoutConfig) -> LayoutResult {
    let mut result = LayoutResult::default();
    let mut cursor = config.origin_y;
    place(tree, 0, expansion, config, &mut cursor, &mut result);
    debug!(
        nodes = result.nodes.len(),
        edges = result.edges.len(),
        "layout computed"
    );
    result
}

fn place(
    node: &TreeNode,
    depth: usize,
    expansion: &ExpansionState,
    config: &LayoutConfig,
    cursor: &mut f32,
    out: &mut LayoutResult,
) {
    let expanded = !node.is_leaf() && expansion.is_expanded(&node.id, depth);

    let x = config.origin_x + depth as f32 * config.horizontal_spacing;
    out.nodes.push(PositionedNode {
        id: node.id.clone(),
        position: config.snap_point(Vec2::new(x, *cursor)),
        size: config.node_size(),
        depth,
        label: node.name.clone(),
        child_count: node.child_count(),
        expanded,
    });
    *cursor += config.vertical_spacing();

    if !expanded {
        return;
    }

    for child in &node.children {
        out.edges.push(Edge::new(node.id.clone(), child.id.clone()));
        place(child, depth + 1, expansion, config, cursor, out);
    }
}
