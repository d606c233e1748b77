use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{read_file, LoadError};

/// Storage integration a folder was fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Service {
    Notion,
    GoogleDrive,
    Dropbox,
    OneDrive,
    Box,
    SharePoint,
    Confluence,
}

impl Service {
    pub const ALL: [Service; 7] = [
        Service::Notion,
        Service::GoogleDrive,
        Service::Dropbox,
        Service::OneDrive,
        Service::Box,
        Service::SharePoint,
        Service::Confluence,
    ];

    /// Canonical integration identifier, also used to build synthetic ids.
    pub fn tag(&self) -> &'static str {
        match self {
            Service::Notion => "notion",
            Service::GoogleDrive => "googledrive",
            Service::Dropbox => "dropbox",
            Service::OneDrive => "onedrive",
            Service::Box => "box",
            Service::SharePoint => "sharepoint",
            Service::Confluence => "confluence",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Service::Notion => "Notion",
            Service::GoogleDrive => "Google Drive",
            Service::Dropbox => "Dropbox",
            Service::OneDrive => "OneDrive",
            Service::Box => "Box",
            Service::SharePoint => "SharePoint",
            Service::Confluence => "Confluence",
        }
    }

    /// Case-insensitive; `-`, `_` and spaces are ignored ("Google Drive" == "google_drive").
    pub fn from_tag(tag: &str) -> Option<Self> {
        let normalized: String = tag
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        Self::ALL.into_iter().find(|s| s.tag() == normalized)
    }

    /// Match an item id such as `notion:abc` or `dropbox/Team` against known tags.
    pub fn from_item_id(id: &str) -> Option<Self> {
        let lower = id.to_lowercase();
        Self::ALL.into_iter().find(|s| {
            let tag = s.tag();
            lower == tag
                || (lower.starts_with(tag)
                    && matches!(lower[tag.len()..].chars().next(), Some(':' | '/' | '-' | '_')))
        })
    }
}

/// Optional size/count figures; each field is independently absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FolderMetrics {
    pub size_bytes: Option<u64>,
    pub file_count: Option<u64>,
    pub folder_count: Option<u64>,
}

/// One folder as delivered by an integration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub metrics: Option<FolderMetrics>,
    /// ISO-8601, kept verbatim.
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub modified_at: Option<String>,
    #[serde(default)]
    pub activity_score: Option<f64>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub children: Vec<FolderItem>,
}

impl FolderItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            path: None,
            service: None,
            metrics: None,
            created_at: None,
            modified_at: None,
            activity_score: None,
            link: None,
            children: Vec::new(),
        }
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn with_children(mut self, children: Vec<FolderItem>) -> Self {
        self.children = children;
        self
    }

    /// Explicit tag wins; otherwise fall back to matching the id.
    pub fn resolve_service(&self) -> Option<Service> {
        match self.service.as_deref() {
            Some(tag) => Service::from_tag(tag),
            None => Service::from_item_id(&self.id),
        }
    }
}

pub fn parse_items(json: &str) -> Result<Vec<FolderItem>, LoadError> {
    Ok(serde_json::from_str(json)?)
}

pub fn load_items(path: &Path) -> Result<Vec<FolderItem>, LoadError> {
    let text = read_file(path)?;
    parse_items(&text)
}
