use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::codec::walk::DEFAULT_MAX_DEPTH;
use crate::error::Result;
use crate::terrain::boundary::VertexLayout;

/// How polygon and polyline payloads are laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutPreference {
    /// Decode under both layouts and keep the plausible one
    #[default]
    Auto,
    VerticesFirst,
    FeatherFirst,
}

impl LayoutPreference {
    pub fn fixed(self) -> Option<VertexLayout> {
        match self {
            Self::Auto => None,
            Self::VerticesFirst => Some(VertexLayout::VerticesFirst),
            Self::FeatherFirst => Some(VertexLayout::FeatherFirst),
        }
    }
}

/// Which scene placements survive extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementFilter {
    /// Template families that are never placed in the world
    pub excluded_prefixes: Vec<String>,
    /// Template families kept even when attached to a parent object
    pub attached_exceptions: Vec<String>,
    pub drop_zero_position: bool,
}

impl Default for PlacementFilter {
    fn default() -> Self {
        Self {
            excluded_prefixes: vec!["object/cell/".into()],
            attached_exceptions: vec!["object/tangible/container/".into()],
            drop_zero_position: true,
        }
    }
}

impl PlacementFilter {
    pub fn is_excluded(&self, template: &str) -> bool {
        self.excluded_prefixes.iter().any(|p| template.starts_with(p.as_str()))
    }

    pub fn is_attached_exception(&self, template: &str) -> bool {
        self.attached_exceptions.iter().any(|p| template.starts_with(p.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    pub vertex_layout: LayoutPreference,
    /// Largest absolute coordinate considered plausible when detecting layouts
    pub world_limit: f32,
    pub max_depth: usize,
    pub placement: PlacementFilter,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            vertex_layout: LayoutPreference::Auto,
            world_limit: 32768.0,
            max_depth: DEFAULT_MAX_DEPTH,
            placement: PlacementFilter::default(),
        }
    }
}

impl ParseOptions {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}
