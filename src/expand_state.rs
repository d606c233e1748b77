use std::collections::HashMap;

use tracing::debug;

use crate::tree::NodeId;

/// Tracks which nodes the user explicitly opened or closed.
///
/// Nodes without an entry fall back to a depth policy: anything shallower than
/// `default_depth` is open. The root (depth 0) is always open.
#[derive(Debug, Clone)]
pub struct ExpansionState {
    explicit: HashMap<NodeId, bool>,
    default_depth: usize,
}

impl Default for ExpansionState {
    fn default() -> Self {
        Self::new(2)
    }
}

impl ExpansionState {
    pub fn new(default_depth: usize) -> Self {
        Self {
            explicit: HashMap::new(),
            default_depth,
        }
    }

    /// Effective state: explicit entry if present, otherwise the depth default.
    pub fn is_expanded(&self, id: &NodeId, depth: usize) -> bool {
        if depth == 0 {
            return true;
        }
        self.explicit
            .get(id)
            .copied()
            .unwrap_or(depth < self.default_depth)
    }

    /// Flip the effective state. Leaves and the root are left alone. Returns
    /// the new state, or `None` on no-op.
    pub fn toggle(&mut self, id: &NodeId, depth: usize, child_count: usize) -> Option<bool> {
        if child_count == 0 || depth == 0 {
            return None;
        }
        let next = !self.is_expanded(id, depth);
        self.explicit.insert(id.clone(), next);
        debug!(node = %id, expanded = next, "toggled expansion");
        Some(next)
    }

    pub fn set(&mut self, id: &NodeId, expanded: bool) {
        self.explicit.insert(id.clone(), expanded);
    }

    /// Forget every explicit entry and fall back to the depth defaults.
    pub fn collapse_all(&mut self) {
        self.explicit.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let state = ExpansionState::new(2);
        let id = NodeId::from("x");

        assert!(state.is_expanded(&NodeId::root(), 0));
        assert!(state.is_expanded(&id, 1));
        assert!(!state.is_expanded(&id, 2));
        assert!(!state.is_expanded(&id, 5));
    }

    #[test]
    fn test_root_always_expanded() {
        let mut state = ExpansionState::new(0);
        state.set(&NodeId::root(), false);
        assert!(state.is_expanded(&NodeId::root(), 0));
    }

    #[test]
    fn test_toggle_flips_effective_state() {
        let mut state = ExpansionState::new(2);
        let shallow = NodeId::from("shallow");
        let deep = NodeId::from("deep");

        assert_eq!(state.toggle(&shallow, 1, 3), Some(false));
        assert!(!state.is_expanded(&shallow, 1));

        assert_eq!(state.toggle(&deep, 3, 1), Some(true));
        assert!(state.is_expanded(&deep, 3));

        assert_eq!(state.toggle(&deep, 3, 1), Some(false));
        assert!(!state.is_expanded(&deep, 3));
    }

    #[test]
    fn test_toggle_leaf_is_noop() {
        let mut state = ExpansionState::new(2);
        let leaf = NodeId::from("leaf");

        assert_eq!(state.toggle(&leaf, 3, 0), None);
        assert!(state.explicit.is_empty());

        assert_eq!(state.toggle(&NodeId::root(), 0, 4), None);
        assert!(state.explicit.is_empty());
    }

    #[test]
    fn test_collapse_all() {
        let mut state = ExpansionState::new(2);
        state.set(&NodeId::from("a"), true);
        state.set(&NodeId::from("b"), false);

        state.collapse_all();
        assert!(state.explicit.is_empty());
        assert!(!state.is_expanded(&NodeId::from("a"), 3));
        assert!(state.is_expanded(&NodeId::from("b"), 1));
    }
}
