/// Element type of every matrix in the workspace.
pub type Float = f64;

/// Cluster or class index.
pub type Label = usize;
