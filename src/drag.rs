use std::cmp::Ordering;

use glam::Vec2;
use tracing::debug;

use crate::canvas::Viewport;
use crate::config::{CoMove, LayoutConfig};
use crate::layout::{LayoutResult, PositionedNode};
use crate::lookup::LookupIndex;
use crate::order::CustomOrderMap;
use crate::overlay::ManualPositionMap;
use crate::tree::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// State of one drag gesture, alive from pointer-down to drop or cancel.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub node: NodeId,
    /// Pointer minus node origin at grab time, in world units.
    pub offset: Vec2,
    /// Node position when grabbed.
    pub origin: Vec2,
    /// Current unsnapped node position.
    pub live: Vec2,
    /// Rendered descendants moving with the node, with their grab-time positions.
    carried: Vec<(NodeId, Vec2)>,
    moved: bool,
}

impl DragSession {
    pub fn delta(&self) -> Vec2 {
        self.live - self.origin
    }

    /// True once any pointer move arrived after the grab.
    pub fn has_moved(&self) -> bool {
        self.moved
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragPhase {
    #[default]
    Idle,
    Dragging(DragSession),
}

/// What a completed drop wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct DropOutcome {
    pub node: NodeId,
    /// Grid-snapped position stored for `node`.
    pub position: Vec2,
    /// New sibling order under `parent`, when the drop changed it.
    pub reordered: Option<(NodeId, Vec<NodeId>)>,
}

/// Pointer-capture drag protocol: idle → dragging → idle.
#[derive(Debug, Clone, Default)]
pub struct DragController {
    phase: DragPhase,
    co_move: CoMove,
}

impl DragController {
    pub fn new(co_move: CoMove) -> Self {
        Self {
            phase: DragPhase::Idle,
            co_move,
        }
    }

    pub fn phase(&self) -> &DragPhase {
        &self.phase
    }

    pub fn session(&self) -> Option<&DragSession> {
        match &self.phase {
            DragPhase::Dragging(session) => Some(session),
            DragPhase::Idle => None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.session().is_some()
    }

    pub fn co_move(&self) -> CoMove {
        self.co_move
    }

    /// Takes effect from the next grab.
    pub fn set_co_move(&mut self, co_move: CoMove) {
        self.co_move = co_move;
    }

    /// Topmost node under a world-space point. Later nodes draw over earlier ones.
    pub fn hit_test(frame: &LayoutResult, world: Vec2) -> Option<&PositionedNode> {
        frame.nodes.iter().rev().find(|node| node.rect().contains(world))
    }

    /// Pointer-down. Grabs the node under the pointer unless it is the root,
    /// the button is not primary, or a drag is already in progress.
    pub fn start(
        &mut self,
        frame: &LayoutResult,
        index: &LookupIndex,
        viewport: &Viewport,
        screen: Vec2,
        button: PointerButton,
    ) -> Option<NodeId> {
        if button != PointerButton::Primary || self.is_dragging() {
            return None;
        }

        let world = viewport.screen_to_world(screen);
        let hit = Self::hit_test(frame, world)?;
        if index.root() == Some(&hit.id) || hit.id.is_root() {
            return None;
        }

        let carried = match self.co_move {
            CoMove::NodeOnly => Vec::new(),
            CoMove::Subtree => index
                .descendants(&hit.id)
                .into_iter()
                .filter_map(|id| frame.position_of(&id).map(|pos| (id, pos)))
                .collect(),
        };

        debug!(node = %hit.id, carried = carried.len(), "drag started");
        self.phase = DragPhase::Dragging(DragSession {
            node: hit.id.clone(),
            offset: world - hit.position,
            origin: hit.position,
            live: hit.position,
            carried,
            moved: false,
        });
        Some(hit.id.clone())
    }

    /// Pointer-move. Returns the node's live position, or `None` when idle.
    pub fn drag_to(&mut self, viewport: &Viewport, screen: Vec2) -> Option<Vec2> {
        let DragPhase::Dragging(session) = &mut self.phase else {
            return None;
        };
        let world = viewport.screen_to_world(screen);
        session.live = world - session.offset;
        session.moved = true;
        Some(session.live)
    }

    /// Live positions for the grabbed node and anything it carries.
    pub fn live_positions(&self) -> Vec<(NodeId, Vec2)> {
        let Some(session) = self.session() else {
            return Vec::new();
        };
        let delta = session.delta();
        let mut out = Vec::with_capacity(session.carried.len() + 1);
        out.push((session.node.clone(), session.live));
        out.extend(
            session
                .carried
                .iter()
                .map(|(id, start)| (id.clone(), *start + delta)),
        );
        out
    }

    /// Overlay live positions on a committed frame for display.
    pub fn apply_live(&self, mut frame: LayoutResult) -> LayoutResult {
        let live = self.live_positions();
        if live.is_empty() {
            return frame;
        }
        for node in &mut frame.nodes {
            if let Some((_, pos)) = live.iter().find(|(id, _)| id == &node.id) {
                node.position = *pos;
            }
        }
        frame
    }

    /// Pointer-up. Snaps and stores the node's position, then rewrites its
    /// parent's sibling order if the drop changed the vertical ranking.
    ///
    /// `frame` is the last committed layout, without live positions.
    pub fn stop(
        &mut self,
        frame: &LayoutResult,
        index: &LookupIndex,
        config: &LayoutConfig,
        orders: &mut CustomOrderMap,
        positions: &mut ManualPositionMap,
    ) -> Option<DropOutcome> {
        let DragPhase::Dragging(session) = std::mem::take(&mut self.phase) else {
            return None;
        };

        let snapped = config.snap_point(session.live);
        positions.set_manual_position(session.node.clone(), snapped);

        let reordered = index.parent_of(&session.node).and_then(|parent| {
            let order = sibling_order_after_drop(frame, index, parent, &session.node, snapped.y)?;
            orders.set_order(parent.clone(), order.clone());
            Some((parent.clone(), order))
        });

        debug!(
            node = %session.node,
            x = snapped.x,
            y = snapped.y,
            reordered = reordered.is_some(),
            "drag dropped"
        );
        Some(DropOutcome {
            node: session.node,
            position: snapped,
            reordered,
        })
    }

    /// Pointer capture lost or gesture abandoned. Nothing is written.
    pub fn cancel(&mut self) -> Option<NodeId> {
        match std::mem::take(&mut self.phase) {
            DragPhase::Dragging(session) => {
                debug!(node = %session.node, "drag cancelled");
                Some(session.node)
            }
            DragPhase::Idle => None,
        }
    }
}

/// Rank the rendered siblings by y, with `dropped` at `drop_y`. Returns the
/// new order only when it differs from the current render order.
fn sibling_order_after_drop(
    frame: &LayoutResult,
    index: &LookupIndex,
    parent: &NodeId,
    dropped: &NodeId,
    drop_y: f32,
) -> Option<Vec<NodeId>> {
    // (render slot, y, id)
    let mut siblings: Vec<(usize, f32, &NodeId)> = index
        .children_of(parent)
        .iter()
        .filter_map(|id| {
            let slot = frame.nodes.iter().position(|n| &n.id == id)?;
            let y = if id == dropped {
                drop_y
            } else {
                frame.nodes[slot].position.y
            };
            Some((slot, y, id))
        })
        .collect();

    if siblings.len() < 2 {
        return None;
    }

    siblings.sort_by_key(|(slot, _, _)| *slot);
    let current: Vec<NodeId> = siblings.iter().map(|(_, _, id)| (*id).clone()).collect();

    // On a tie the dropped node takes the slot it landed on.
    siblings.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| (b.2 == dropped).cmp(&(a.2 == dropped)))
            .then_with(|| a.0.cmp(&b.0))
    });
    let next: Vec<NodeId> = siblings.into_iter().map(|(_, _, id)| id.clone()).collect();

    (next != current).then_some(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand_state::ExpansionState;
    use crate::layout::layout;
    use crate::source::FolderItem;
    use crate::tree::{build_tree, TreeNode};

    struct Fixture {
        frame: LayoutResult,
        index: LookupIndex,
        viewport: Viewport,
        config: LayoutConfig,
    }

    fn tree() -> TreeNode {
        build_tree(&[
            FolderItem::new("a", "A")
                .with_service("notion")
                .with_children(vec![FolderItem::new("a1", "A1")]),
            FolderItem::new("b", "B").with_service("notion"),
            FolderItem::new("c", "C").with_service("notion"),
        ])
    }

    fn fixture() -> Fixture {
        let tree = tree();
        let config = LayoutConfig::default();
        let mut expansion = ExpansionState::new(2);
        expansion.set(&NodeId::from("a"), true);
        Fixture {
            frame: layout(&tree, &expansion, &config),
            index: LookupIndex::build(&tree),
            viewport: Viewport::new(1000.0, 800.0),
            config,
        }
    }

    // Node rows: root 0, notion 60, a 120, a1 180, b 240, c 300
    fn grab(ctrl: &mut DragController, fx: &Fixture, at: Vec2) -> Option<NodeId> {
        ctrl.start(&fx.frame, &fx.index, &fx.viewport, at, PointerButton::Primary)
    }

    #[test]
    fn test_hit_test() {
        let fx = fixture();
        let hit = DragController::hit_test(&fx.frame, Vec2::new(490.0, 130.0)).unwrap();
        assert_eq!(hit.id, NodeId::from("a"));
        assert!(DragController::hit_test(&fx.frame, Vec2::new(900.0, 130.0)).is_none());
    }

    #[test]
    fn test_root_and_secondary_button_ignored() {
        let fx = fixture();
        let mut ctrl = DragController::new(CoMove::Subtree);

        assert_eq!(grab(&mut ctrl, &fx, Vec2::new(10.0, 10.0)), None);
        assert_eq!(
            ctrl.start(&fx.frame, &fx.index, &fx.viewport, Vec2::new(490.0, 250.0), PointerButton::Secondary),
            None
        );
        assert!(!ctrl.is_dragging());
    }

    #[test]
    fn test_single_session() {
        let fx = fixture();
        let mut ctrl = DragController::new(CoMove::Subtree);

        assert_eq!(grab(&mut ctrl, &fx, Vec2::new(490.0, 250.0)), Some(NodeId::from("b")));
        assert_eq!(grab(&mut ctrl, &fx, Vec2::new(490.0, 310.0)), None);
        assert_eq!(ctrl.session().unwrap().node, NodeId::from("b"));
    }

    #[test]
    fn test_live_position_keeps_grab_offset() {
        let fx = fixture();
        let mut ctrl = DragController::new(CoMove::NodeOnly);
        grab(&mut ctrl, &fx, Vec2::new(500.0, 250.0));

        let live = ctrl.drag_to(&fx.viewport, Vec2::new(533.0, 207.0)).unwrap();
        assert_eq!(live, Vec2::new(513.0, 197.0));
        assert!(ctrl.session().unwrap().has_moved());
        assert_eq!(ctrl.live_positions().len(), 1);
    }

    #[test]
    fn test_co_move_carries_subtree() {
        let fx = fixture();
        let mut ctrl = DragController::new(CoMove::Subtree);
        grab(&mut ctrl, &fx, Vec2::new(490.0, 130.0));
        ctrl.drag_to(&fx.viewport, Vec2::new(590.0, 150.0));

        let shown = ctrl.apply_live(fx.frame.clone());
        assert_eq!(shown.position_of(&NodeId::from("a")), Some(Vec2::new(580.0, 140.0)));
        assert_eq!(shown.position_of(&NodeId::from("a1")), Some(Vec2::new(820.0, 200.0)));
        assert_eq!(shown.position_of(&NodeId::from("b")), fx.frame.position_of(&NodeId::from("b")));
    }

    #[test]
    fn test_node_only_leaves_descendants() {
        let fx = fixture();
        let mut ctrl = DragController::new(CoMove::NodeOnly);
        grab(&mut ctrl, &fx, Vec2::new(490.0, 130.0));
        ctrl.drag_to(&fx.viewport, Vec2::new(590.0, 150.0));

        let shown = ctrl.apply_live(fx.frame.clone());
        assert_eq!(shown.position_of(&NodeId::from("a1")), fx.frame.position_of(&NodeId::from("a1")));
    }

    #[test]
    fn test_drop_snaps_and_reorders() {
        let fx = fixture();
        let mut ctrl = DragController::new(CoMove::Subtree);
        let mut orders = CustomOrderMap::new();
        let mut positions = ManualPositionMap::new();

        // grab c and lift it above a
        grab(&mut ctrl, &fx, Vec2::new(490.0, 310.0));
        ctrl.drag_to(&fx.viewport, Vec2::new(497.0, 103.0));
        let outcome = ctrl
            .stop(&fx.frame, &fx.index, &fx.config, &mut orders, &mut positions)
            .unwrap();

        // live (487, 93) lands on the grid at (480, 100)
        assert_eq!(outcome.position, Vec2::new(480.0, 100.0));
        assert_eq!(positions.get(&NodeId::from("c")), Some(Vec2::new(480.0, 100.0)));
        let notion = NodeId::from("service:notion");
        let expected: Vec<NodeId> = ["c", "a", "b"].iter().map(|s| NodeId::from(*s)).collect();
        assert_eq!(outcome.reordered, Some((notion.clone(), expected.clone())));
        assert_eq!(orders.get(&notion), Some(expected.as_slice()));
        assert!(!ctrl.is_dragging());
        // descendants are not committed individually
        assert_eq!(positions.len(), 1);
    }

    #[test]
    fn test_horizontal_drop_keeps_order() {
        let fx = fixture();
        let mut ctrl = DragController::new(CoMove::Subtree);
        let mut orders = CustomOrderMap::new();
        let mut positions = ManualPositionMap::new();

        grab(&mut ctrl, &fx, Vec2::new(490.0, 250.0));
        ctrl.drag_to(&fx.viewport, Vec2::new(700.0, 252.0));
        let outcome = ctrl
            .stop(&fx.frame, &fx.index, &fx.config, &mut orders, &mut positions)
            .unwrap();

        assert_eq!(outcome.reordered, None);
        assert!(orders.is_empty());
        assert_eq!(outcome.position, Vec2::new(700.0, 240.0));
    }

    #[test]
    fn test_tie_places_dropped_first() {
        let fx = fixture();
        let mut ctrl = DragController::new(CoMove::Subtree);
        let mut orders = CustomOrderMap::new();
        let mut positions = ManualPositionMap::new();

        // c lands exactly on b's row
        grab(&mut ctrl, &fx, Vec2::new(480.0, 300.0));
        ctrl.drag_to(&fx.viewport, Vec2::new(480.0, 240.0));
        ctrl.stop(&fx.frame, &fx.index, &fx.config, &mut orders, &mut positions);

        let order: Vec<String> = orders
            .get(&NodeId::from("service:notion"))
            .unwrap()
            .iter()
            .map(|id| id.to_string())
            .collect();
        assert_eq!(order, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_cancel_writes_nothing() {
        let fx = fixture();
        let mut ctrl = DragController::new(CoMove::Subtree);
        let orders = CustomOrderMap::new();
        let positions = ManualPositionMap::new();

        grab(&mut ctrl, &fx, Vec2::new(490.0, 310.0));
        ctrl.drag_to(&fx.viewport, Vec2::new(100.0, 0.0));
        assert_eq!(ctrl.cancel(), Some(NodeId::from("c")));

        assert!(!ctrl.is_dragging());
        assert!(ctrl.live_positions().is_empty());
        assert_eq!(ctrl.apply_live(fx.frame.clone()), fx.frame);
        assert!(orders.is_empty() && positions.is_empty());
        assert_eq!(ctrl.cancel(), None);
    }

    #[test]
    fn test_pointer_translated_through_viewport() {
        let mut fx = fixture();
        fx.viewport.zoom(1.0, Vec2::ZERO);
        let mut ctrl = DragController::new(CoMove::NodeOnly);

        // world (490, 250) is screen (980, 500) at 2x
        assert_eq!(grab(&mut ctrl, &fx, Vec2::new(980.0, 500.0)), Some(NodeId::from("b")));
        let live = ctrl.drag_to(&fx.viewport, Vec2::new(1000.0, 520.0)).unwrap();
        assert_eq!(live, Vec2::new(490.0, 250.0));
    }
}
