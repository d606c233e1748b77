use std::collections::HashMap;

use glam::Vec2;
use tracing::debug;

use crate::canvas::Viewport;
use crate::config::{CoMove, LayoutConfig};
use crate::drag::{DragController, DropOutcome, PointerButton};
use crate::error::ConfigError;
use crate::expand_state::ExpansionState;
use crate::layout::{layout, Edge, LayoutResult};
use crate::lookup::LookupIndex;
use crate::order::{reorder, CustomOrderMap};
use crate::overlay::ManualPositionMap;
use crate::source::{FolderItem, FolderMetrics, Service};
use crate::tree::{build_tree, filter_service, NodeId, TreeNode};

/// Everything a renderer needs to draw one node.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderNode {
    pub id: NodeId,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub label: String,
    pub depth: usize,
    pub service: Option<Service>,
    pub metrics: Option<FolderMetrics>,
    pub link: Option<String>,
    pub created_at: Option<String>,
    pub modified_at: Option<String>,
    pub activity_score: Option<f64>,
    pub lineage: Vec<String>,
    pub child_count: usize,
    pub expanded: bool,
    pub is_root: bool,
    /// Currently held by the pointer.
    pub dragging: bool,
}

impl RenderNode {
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// One frame of the outbound render contract.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub nodes: Vec<RenderNode>,
    pub edges: Vec<Edge>,
}

impl Frame {
    pub fn node(&self, id: &NodeId) -> Option<&RenderNode> {
        self.nodes.iter().find(|n| &n.id == id)
    }
}

/// Single owner of the interactive state for one mounted diagram.
///
/// All mutation goes through named operations. Each one marks the layout
/// dirty, and the next read recomputes tree → order → layout → overlay
/// before anything is observed.
pub struct GraphSession {
    config: LayoutConfig,
    full_tree: TreeNode,
    full_index: LookupIndex,
    filter: Option<Service>,
    view_tree: TreeNode,
    view_index: LookupIndex,
    expansion: ExpansionState,
    orders: CustomOrderMap,
    positions: ManualPositionMap,
    drag: DragController,
    viewport: Viewport,
    committed: LayoutResult,
    dirty: bool,
}

impl GraphSession {
    /// Fails when `config` would produce off-grid or non-finite geometry.
    pub fn new(items: &[FolderItem], config: LayoutConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let full_tree = build_tree(items);
        let full_index = LookupIndex::build(&full_tree);
        let mut session = Self {
            expansion: ExpansionState::new(config.default_expand_depth),
            drag: DragController::new(config.co_move),
            viewport: Viewport::new(0.0, 0.0),
            view_tree: full_tree.clone(),
            view_index: full_index.clone(),
            full_tree,
            full_index,
            filter: None,
            orders: CustomOrderMap::new(),
            positions: ManualPositionMap::new(),
            committed: LayoutResult::default(),
            dirty: true,
            config,
        };
        session.refresh();
        Ok(session)
    }

    /// Replace the folder collection. Stored sibling orders are repaired
    /// against the new children sets; expansion and positions are kept.
    pub fn set_items(&mut self, items: &[FolderItem]) {
        self.drag.cancel();
        self.full_tree = build_tree(items);
        self.full_index = LookupIndex::build(&self.full_tree);
        self.orders.repair(&self.full_index);
        self.dirty = true;
    }

    /// Narrow the view to one service, or show all with `None`.
    pub fn set_service_filter(&mut self, filter: Option<Service>) {
        if self.filter == filter {
            return;
        }
        self.drag.cancel();
        self.filter = filter;
        self.dirty = true;
    }

    pub fn service_filter(&self) -> Option<Service> {
        self.filter
    }

    /// Services present in the collection, in tree order.
    pub fn services(&self) -> Vec<Service> {
        self.full_tree
            .children
            .iter()
            .filter_map(|child| child.service)
            .collect()
    }

    pub fn set_co_move(&mut self, co_move: CoMove) {
        self.config.co_move = co_move;
        self.drag.set_co_move(co_move);
    }

    pub fn co_move(&self) -> CoMove {
        self.drag.co_move()
    }

    /// Open or close a node. The node is pinned where it is drawn first so the
    /// relayout does not move it. The root, leaves, hidden and unknown ids are
    /// no-ops. A drag in progress is cancelled either way.
    pub fn toggle(&mut self, id: &NodeId) -> Option<bool> {
        self.drag.cancel();
        self.refresh();
        let depth = self.view_index.depth_of(id)?;
        let child_count = self.view_index.children_of(id).len();
        if child_count == 0 || depth == 0 || !self.committed.contains(id) {
            return None;
        }
        self.positions.pin(id, &self.committed);
        let expanded = self.expansion.toggle(id, depth, child_count)?;
        self.dirty = true;
        Some(expanded)
    }

    /// Drop every explicit open/close and return to the depth defaults.
    /// Manual positions and sibling orders are kept.
    pub fn collapse_all(&mut self) {
        self.drag.cancel();
        self.expansion.collapse_all();
        self.dirty = true;
    }

    pub fn pointer_down(&mut self, screen: Vec2, button: PointerButton) -> Option<NodeId> {
        self.refresh();
        self.drag
            .start(&self.committed, &self.view_index, &self.viewport, screen, button)
    }

    pub fn pointer_move(&mut self, screen: Vec2) -> Option<Vec2> {
        self.drag.drag_to(&self.viewport, screen)
    }

    pub fn pointer_up(&mut self) -> Option<DropOutcome> {
        self.refresh();
        let outcome = self.drag.stop(
            &self.committed,
            &self.view_index,
            &self.config,
            &mut self.orders,
            &mut self.positions,
        )?;
        self.dirty = true;
        Some(outcome)
    }

    /// Gesture abandoned without a drop; the committed layout stands.
    pub fn pointer_capture_lost(&mut self) -> Option<NodeId> {
        self.drag.cancel()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    /// Whether the held node has moved since it was grabbed, `None` when idle.
    pub fn drag_moved(&self) -> Option<bool> {
        self.drag.session().map(|s| s.has_moved())
    }

    /// The last committed layout with manual positions applied, without any
    /// live drag displacement.
    pub fn layout(&mut self) -> &LayoutResult {
        self.refresh();
        &self.committed
    }

    /// Build the render contract for the current state, live drag included.
    pub fn frame(&mut self) -> Frame {
        self.refresh();
        let shown = self.drag.apply_live(self.committed.clone());
        let held = self.drag.session().map(|s| s.node.clone());

        let mut by_id: HashMap<&NodeId, &TreeNode> = HashMap::new();
        collect_nodes(&self.view_tree, &mut by_id);

        let nodes = shown
            .nodes
            .into_iter()
            .map(|node| {
                let source = by_id.get(&node.id).copied();
                let folder = source.and_then(|t| t.folder.as_ref());
                RenderNode {
                    dragging: held.as_ref() == Some(&node.id),
                    is_root: node.id.is_root(),
                    x: node.position.x,
                    y: node.position.y,
                    width: node.size.x,
                    height: node.size.y,
                    label: node.label,
                    depth: node.depth,
                    service: source.and_then(|t| t.service),
                    metrics: folder.and_then(|f| f.metrics.clone()),
                    link: folder.and_then(|f| f.link.clone()),
                    created_at: folder.and_then(|f| f.created_at.clone()),
                    modified_at: folder.and_then(|f| f.modified_at.clone()),
                    activity_score: folder.and_then(|f| f.activity_score),
                    lineage: source.map(|t| t.lineage.clone()).unwrap_or_default(),
                    child_count: node.child_count,
                    expanded: node.expanded,
                    id: node.id,
                }
            })
            .collect();

        Frame {
            nodes,
            edges: shown.edges,
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn expansion(&self) -> &ExpansionState {
        &self.expansion
    }

    pub fn orders(&self) -> &CustomOrderMap {
        &self.orders
    }

    pub fn positions(&self) -> &ManualPositionMap {
        &self.positions
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    /// The filtered, reordered tree the current layout was built from.
    pub fn view_tree(&mut self) -> &TreeNode {
        self.refresh();
        &self.view_tree
    }

    fn refresh(&mut self) {
        if !self.dirty {
            return;
        }
        let narrowed = match self.filter {
            Some(service) => filter_service(&self.full_tree, service),
            None => self.full_tree.clone(),
        };
        self.view_tree = reorder(&narrowed, &self.orders);
        self.view_index = LookupIndex::build(&self.view_tree);
        let computed = layout(&self.view_tree, &self.expansion, &self.config);
        self.committed = self.positions.apply(computed);
        self.dirty = false;
        debug!(
            filter = ?self.filter,
            nodes = self.committed.nodes.len(),
            "session refreshed"
        );
    }
}

fn collect_nodes<'a>(node: &'a TreeNode, out: &mut HashMap<&'a NodeId, &'a TreeNode>) {
    out.insert(&node.id, node);
    for child in &node.children {
        collect_nodes(child, out);
    }
}
