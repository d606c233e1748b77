use std::collections::HashMap;

use crate::tree::{NodeId, TreeNode};

/// Parent, children and depth indices built in one pass over a tree.
#[derive(Debug, Clone, Default)]
pub struct LookupIndex {
    root: Option<NodeId>,
    parent: HashMap<NodeId, NodeId>,
    children: HashMap<NodeId, Vec<NodeId>>,
    depth: HashMap<NodeId, usize>,
}

impl LookupIndex {
    pub fn build(tree: &TreeNode) -> Self {
        let mut index = Self {
            root: Some(tree.id.clone()),
            ..Self::default()
        };
        index.visit(tree, 0);
        index
    }

    fn visit(&mut self, node: &TreeNode, depth: usize) {
        self.depth.insert(node.id.clone(), depth);
        self.children.insert(
            node.id.clone(),
            node.children.iter().map(|c| c.id.clone()).collect(),
        );
        for child in &node.children {
            self.parent.insert(child.id.clone(), node.id.clone());
            self.visit(child, depth + 1);
        }
    }

    pub fn root(&self) -> Option<&NodeId> {
        self.root.as_ref()
    }

    pub fn parent_of(&self, id: &NodeId) -> Option<&NodeId> {
        self.parent.get(id)
    }

    /// Ordered child ids; empty for leaves and unknown ids.
    pub fn children_of(&self, id: &NodeId) -> &[NodeId] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn depth_of(&self, id: &NodeId) -> Option<usize> {
        self.depth.get(id).copied()
    }

    /// Every descendant, pre-order, excluding `id` itself.
    pub fn descendants(&self, id: &NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<&NodeId> = self.children_of(id).iter().rev().collect();
        while let Some(next) = stack.pop() {
            out.push(next.clone());
            stack.extend(self.children_of(next).iter().rev());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::FolderItem;
    use crate::tree::build_tree;

    fn sample() -> TreeNode {
        build_tree(&[FolderItem::new("a", "A")
            .with_service("notion")
            .with_children(vec![
                FolderItem::new("a1", "A1").with_children(vec![FolderItem::new("a1x", "A1x")]),
                FolderItem::new("a2", "A2"),
            ])])
    }

    #[test]
    fn test_parent_and_children() {
        let index = LookupIndex::build(&sample());
        let notion = NodeId::from("service:notion");

        assert_eq!(index.root(), Some(&NodeId::root()));
        assert_eq!(index.parent_of(&NodeId::from("a")), Some(&notion));
        assert_eq!(index.parent_of(&NodeId::root()), None);
        assert_eq!(
            index.children_of(&NodeId::from("a")),
            &[NodeId::from("a1"), NodeId::from("a2")]
        );
        assert!(index.children_of(&NodeId::from("missing")).is_empty());
    }

    #[test]
    fn test_depth() {
        let index = LookupIndex::build(&sample());
        assert_eq!(index.depth_of(&NodeId::root()), Some(0));
        assert_eq!(index.depth_of(&NodeId::from("a")), Some(2));
        assert_eq!(index.depth_of(&NodeId::from("a1x")), Some(4));
        assert_eq!(index.depth_of(&NodeId::from("nope")), None);
    }

    #[test]
    fn test_descendants_preorder() {
        let index = LookupIndex::build(&sample());
        let ids: Vec<_> = index
            .descendants(&NodeId::from("a"))
            .into_iter()
            .map(|id| id.to_string())
            .collect();
        assert_eq!(ids, vec!["a1", "a1x", "a2"]);
    }
}
