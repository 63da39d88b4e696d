//! Common utilities and data structures shared by the navgen crates

mod geometry;

pub use geometry::*;

/// Represents a 3D position
pub type Vec3 = glam::Vec3;

/// Error types for the library
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for navgen operations
pub type Result<T> = std::result::Result<T, Error>;
