//! Spatial partitioning for interest management
//!
//! This module provides the data structures the strategies use to avoid
//! comparing every entity with every connection: a uniform grid for
//! proximity and a key-based partition index for scenes and matches.

mod grid;
mod partition;

pub use grid::{CellKey, SpatialGrid};
pub use partition::PartitionIndex;
