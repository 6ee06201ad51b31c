pub mod k_means;

pub use lattice_core::{LatticeError, Result};

pub use k_means::{Initializer, KMeans, KMeansConfig, KMeansState};
