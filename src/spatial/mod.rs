//! Spatial index over unit positions

pub mod sparse_hash;

pub use sparse_hash::SparseHashGrid;
