use std::path::Path;

use glam::Vec2;
use serde::Deserialize;

use crate::error::{read_file, ConfigError};

/// How descendants follow a node while it is being dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoMove {
    /// Only the grabbed node moves.
    NodeOnly,
    /// The whole rendered subtree moves rigidly with the grabbed node.
    #[default]
    Subtree,
}

/// Geometry and policy constants for layout and drag snapping.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub origin_x: f32,
    pub origin_y: f32,
    pub node_width: f32,
    pub node_height: f32,
    /// Gap added below each node before the next row starts.
    pub vertical_padding: f32,
    /// Distance between depth columns; must exceed `node_width`.
    pub horizontal_spacing: f32,
    /// Every emitted or dropped coordinate is a multiple of this.
    pub grid_quantum: f32,
    /// Nodes shallower than this are expanded unless told otherwise.
    pub default_expand_depth: usize,
    pub co_move: CoMove,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            origin_x: 0.0,
            origin_y: 0.0,
            node_width: 180.0,
            node_height: 48.0,
            vertical_padding: 12.0,
            horizontal_spacing: 240.0,
            grid_quantum: 20.0,
            default_expand_depth: 2,
            co_move: CoMove::Subtree,
        }
    }
}

impl LayoutConfig {
    /// Preset measured in terminal character cells.
    pub fn terminal() -> Self {
        Self {
            node_width: 22.0,
            node_height: 1.0,
            vertical_padding: 1.0,
            horizontal_spacing: 26.0,
            grid_quantum: 1.0,
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(crate::error::LoadError::from)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = read_file(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let lengths = [
            ("origin_x", self.origin_x),
            ("origin_y", self.origin_y),
            ("node_width", self.node_width),
            ("node_height", self.node_height),
            ("vertical_padding", self.vertical_padding),
            ("horizontal_spacing", self.horizontal_spacing),
        ];
        if let Some((name, value)) = lengths.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ConfigError::Invalid(format!("{name} must be finite, got {value}")));
        }
        if !(self.grid_quantum.is_finite() && self.grid_quantum > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "grid_quantum must be positive, got {}",
                self.grid_quantum
            )));
        }
        if !(self.node_width > 0.0 && self.node_height > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "node size must be positive, got {}x{}",
                self.node_width, self.node_height
            )));
        }
        if self.vertical_padding < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "vertical_padding must not be negative, got {}",
                self.vertical_padding
            )));
        }
        if self.horizontal_spacing <= self.node_width {
            return Err(ConfigError::Invalid(format!(
                "horizontal_spacing ({}) must exceed node_width ({})",
                self.horizontal_spacing, self.node_width
            )));
        }
        Ok(())
    }

    pub fn origin(&self) -> Vec2 {
        Vec2::new(self.origin_x, self.origin_y)
    }

    pub fn node_size(&self) -> Vec2 {
        Vec2::new(self.node_width, self.node_height)
    }

    /// Row pitch: node height plus padding, rounded up onto the grid so the
    /// static layout and drag snapping share one rhythm.
    pub fn vertical_spacing(&self) -> f32 {
        let raw = self.node_height + self.vertical_padding;
        (raw / self.grid_quantum).ceil() * self.grid_quantum
    }

    pub fn snap(&self, value: f32) -> f32 {
        snap_to_grid(value, self.grid_quantum)
    }

    pub fn snap_point(&self, point: Vec2) -> Vec2 {
        Vec2::new(self.snap(point.x), self.snap(point.y))
    }
}

/// Round to the nearest multiple of `quantum`.
pub fn snap_to_grid(value: f32, quantum: f32) -> f32 {
    let snapped = (value / quantum).round() * quantum;
    // normalise -0.0 so formatted output stays stable
    if snapped == 0.0 {
        0.0
    } else {
        snapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(LayoutConfig::default().validate().is_ok());
        assert!(LayoutConfig::terminal().validate().is_ok());
    }

    #[test]
    fn test_vertical_spacing_is_grid_multiple() {
        let config = LayoutConfig::default();
        assert_eq!(config.vertical_spacing(), 60.0);

        let odd = LayoutConfig {
            node_height: 50.0,
            ..LayoutConfig::default()
        };
        // 62 rounds up to the next grid line
        assert_eq!(odd.vertical_spacing(), 80.0);
    }

    #[test]
    fn test_snap_to_grid() {
        assert_eq!(snap_to_grid(29.0, 20.0), 20.0);
        assert_eq!(snap_to_grid(31.0, 20.0), 40.0);
        assert_eq!(snap_to_grid(-9.0, 20.0), 0.0);
        assert_eq!(snap_to_grid(-11.0, 20.0), -20.0);
    }

    #[test]
    fn test_rejects_narrow_spacing() {
        let config = LayoutConfig {
            horizontal_spacing: 100.0,
            ..LayoutConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = LayoutConfig::from_json_str(r#"{ "grid_quantum": 10, "co_move": "node_only" }"#)
            .unwrap();
        assert_eq!(config.grid_quantum, 10.0);
        assert_eq!(config.co_move, CoMove::NodeOnly);
        assert_eq!(config.node_width, 180.0);
    }

    #[test]
    fn test_from_json_rejects_zero_grid() {
        let err = LayoutConfig::from_json_str(r#"{ "grid_quantum": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_non_finite_lengths() {
        let config = LayoutConfig {
            horizontal_spacing: f32::INFINITY,
            ..LayoutConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = LayoutConfig {
            origin_x: f32::NAN,
            ..LayoutConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
