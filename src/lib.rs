//! Dense matrices and k-means clustering.
//!
//! Re-exports [`lattice_core`] (matrix engine) and [`lattice_models`]
//! (clustering) under one crate.

// Re-export public API
pub use lattice_core::*;
pub use lattice_models::*;
