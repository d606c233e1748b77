use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::source::{FolderItem, FolderMetrics, Service};

pub const ROOT_ID: &str = "root";
const ROOT_NAME: &str = "All sources";

/// Stable node identifier, unique across one tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn root() -> Self {
        Self(ROOT_ID.to_string())
    }

    /// Synthetic id for the node grouping one integration's folders.
    pub fn for_service(service: Service) -> Self {
        Self(format!("service:{}", service.tag()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == ROOT_ID
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Folder data carried through from the source item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FolderInfo {
    pub path: Option<String>,
    pub metrics: Option<FolderMetrics>,
    pub created_at: Option<String>,
    pub modified_at: Option<String>,
    pub activity_score: Option<f64>,
    pub link: Option<String>,
}

impl FolderInfo {
    fn from_item(item: &FolderItem) -> Self {
        Self {
            path: item.path.clone(),
            metrics: item.metrics.clone(),
            created_at: item.created_at.clone(),
            modified_at: item.modified_at.clone(),
            activity_score: item.activity_score,
            link: item.link.clone(),
        }
    }
}

/// A node in the folder tree. Children are owned; order is significant.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub id: NodeId,
    pub name: String,
    /// `None` for the synthetic root and service nodes.
    pub folder: Option<FolderInfo>,
    pub children: Vec<TreeNode>,
    /// Display names of the ancestors below the synthetic root.
    pub lineage: Vec<String>,
    pub service: Option<Service>,
}

impl TreeNode {
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Lineage plus own name, joined for display.
    pub fn display_path(&self) -> String {
        let mut segments: Vec<&str> = self.lineage.iter().map(String::as_str).collect();
        segments.push(&self.name);
        segments.join(" / ")
    }

    pub fn find(&self, id: &NodeId) -> Option<&TreeNode> {
        if &self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// Number of nodes in this subtree, self included.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(TreeNode::node_count).sum::<usize>()
    }
}

/// Build the synthetic root → service → folder tree.
///
/// Service nodes appear in the order their first item appears. Items whose
/// service cannot be resolved are dropped, as are items reusing an id that is
/// already in the tree.
pub fn build_tree(items: &[FolderItem]) -> TreeNode {
    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(ROOT_ID.to_string());
    for service in Service::ALL {
        seen.insert(NodeId::for_service(service).0);
    }

    let mut services: Vec<TreeNode> = Vec::new();

    for item in items {
        let Some(service) = item.resolve_service() else {
            warn!(id = %item.id, tag = ?item.service, "dropping item with unrecognized service");
            continue;
        };

        let index = match services.iter().position(|s| s.service == Some(service)) {
            Some(index) => index,
            None => {
                services.push(TreeNode {
                    id: NodeId::for_service(service),
                    name: service.display_name().to_string(),
                    folder: None,
                    children: Vec::new(),
                    lineage: Vec::new(),
                    service: Some(service),
                });
                services.len() - 1
            }
        };

        let lineage = vec![service.display_name().to_string()];
        if let Some(node) = build_folder(item, service, lineage, &mut seen) {
            services[index].children.push(node);
        }
    }

    TreeNode {
        id: NodeId::root(),
        name: ROOT_NAME.to_string(),
        folder: None,
        children: services,
        lineage: Vec::new(),
        service: None,
    }
}

fn build_folder(
    item: &FolderItem,
    service: Service,
    lineage: Vec<String>,
    seen: &mut HashSet<String>,
) -> Option<TreeNode> {
    if !seen.insert(item.id.clone()) {
        warn!(id = %item.id, "dropping item with duplicate id");
        return None;
    }

    let mut child_lineage = lineage.clone();
    child_lineage.push(item.name.clone());

    let children = item
        .children
        .iter()
        .filter_map(|child| build_folder(child, service, child_lineage.clone(), seen))
        .collect();

    Some(TreeNode {
        id: NodeId::new(item.id.clone()),
        name: item.name.clone(),
        folder: Some(FolderInfo::from_item(item)),
        children,
        lineage,
        service: Some(service),
    })
}

/// Narrow a built tree to root → one service's subtree. Ids are unchanged.
pub fn filter_service(tree: &TreeNode, service: Service) -> TreeNode {
    TreeNode {
        id: tree.id.clone(),
        name: tree.name.clone(),
        folder: tree.folder.clone(),
        children: tree
            .children
            .iter()
            .filter(|child| child.service == Some(service))
            .cloned()
            .collect(),
        lineage: tree.lineage.clone(),
        service: tree.service,
    }
}
