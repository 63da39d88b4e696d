//! Configuration for contour extraction

use navgen_common::{Error, Result};

/// Build flags for contour generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContourBuildFlags {
    /// Whether to tessellate solid (impassable) edges during contour simplification
    pub tessellate_wall_edges: bool,
    /// Whether to tessellate edges between areas during contour simplification
    pub tessellate_area_edges: bool,
}

impl Default for ContourBuildFlags {
    fn default() -> Self {
        Self {
            tessellate_wall_edges: true,
            tessellate_area_edges: false,
        }
    }
}

/// Configuration parameters for contour extraction
#[derive(Debug, Clone, PartialEq)]
pub struct ContourConfig {
    /// The maximum distance a simplified contour's border edges should deviate
    /// from the original raw contour, in cell units
    pub max_error: f32,
    /// The maximum allowed length for contour edges along the border of the
    /// mesh, in cells; 0 disables long-edge tessellation
    pub max_edge_len: i32,
    /// Which edge classes long-edge tessellation may split
    pub flags: ContourBuildFlags,
}

impl Default for ContourConfig {
    fn default() -> Self {
        Self {
            max_error: 1.3,
            max_edge_len: 12,
            flags: ContourBuildFlags::default(),
        }
    }
}

impl ContourConfig {
    /// Creates a new ContourConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.max_error < 0.0 || !self.max_error.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "max_error must be a finite value >= 0, got {}",
                self.max_error
            )));
        }
        if self.max_edge_len < 0 {
            return Err(Error::InvalidConfig(format!(
                "max_edge_len must be >= 0, got {}",
                self.max_edge_len
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_flags() {
        let flags = ContourBuildFlags::default();
        assert!(flags.tessellate_wall_edges);
        assert!(!flags.tessellate_area_edges);
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(ContourConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_negative_error() {
        let config = ContourConfig {
            max_error: -0.1,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ContourConfig {
            max_error: f32::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_negative_edge_len() {
        let config = ContourConfig {
            max_edge_len: -1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
