//! Contour extraction for navigation-mesh generation
//!
//! This crate implements the contour stage of a navmesh pipeline: given a
//! voxelized, region-labeled walkable surface (a compact heightfield), it
//! produces a closed 2.5D polygonal contour per region, in voxel
//! coordinates, ready for downstream polygonization.
//!
//! The input contract lives in [`compact_heightfield`]; the stage itself is
//! driven through [`ContourSet::build`].

mod compact_heightfield;
mod config;
mod contour;
mod contour_scenario_tests;

pub use compact_heightfield::{
    dir_offset_x, dir_offset_z, is_border, is_border_or_null, CompactCell, CompactHeightfield,
    CompactSpan, SpanData, BORDER_REG, NULL_AREA, NULL_REGION,
};
pub use config::{ContourBuildFlags, ContourConfig};
pub use contour::{
    calc_area_of_polygon_2d, Contour, ContourSet, ContourVertex, AREA_BORDER, BORDER_VERTEX,
    CONTOUR_REG_MASK,
};
