#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use lattice_core::{Float, Label, LatticeError, Matrix, MatrixMut, MatrixRef, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Marker for "no cluster yet" in the previous-assignment buffer.
const UNASSIGNED: Label = Label::MAX;

/// How the engine seeds its centroids.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Initializer {
    /// Rows `0..k` of the data, in row order. Deterministic.
    #[default]
    FirstRows,
    /// `k` distinct rows sampled uniformly without replacement.
    RandomRows,
    /// **K-Means++**: first centroid uniformly at random, each further one
    /// sampled with probability proportional to its squared distance from
    /// the nearest centroid chosen so far.
    PlusPlus,
}

/// Tunables for [`KMeans`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KMeansConfig {
    /// Centroid seeding strategy.
    pub init: Initializer,
    /// When `false` (default) every [`fit`](KMeans::fit) reseeds the
    /// centroids. When `true` only the first fit seeds them and later fits
    /// continue from the current centroids.
    pub warm_start: bool,
    /// Seed for the random initializers. Unused by
    /// [`Initializer::FirstRows`].
    pub seed: u64,
}

impl KMeansConfig {
    pub fn with_init(mut self, init: Initializer) -> Self {
        self.init = init;
        self
    }

    pub fn with_warm_start(mut self, warm_start: bool) -> Self {
        self.warm_start = warm_start;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Where the engine is in its fit lifecycle.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KMeansState {
    /// Constructed, never fitted. Centroids are all zero.
    Uninitialized,
    /// Inside the Lloyd loop.
    Fitting,
    /// The last fit stopped because a pass changed no assignment.
    Converged,
    /// The last fit ran out of iterations.
    MaxIterReached,
}

/// **K-Means clustering** using squared Euclidean distance.
///
/// K-Means is an **unsupervised learning** algorithm that partitions `n` samples
/// into `k` clusters by iteratively:
/// 1. Assigning each sample to the nearest centroid
/// 2. Updating centroids as the mean of assigned samples
///
/// # Algorithm
///
/// **Lloyd's algorithm**:
/// 1. Seed `k` centroids (first `k` rows by default, see [`Initializer`])
/// 2. Repeat at most `max_iters` times:
///    - **Assignment step**: assign each sample to its closest centroid; ties
///      go to the lowest centroid index
///    - If no assignment changed, stop ([`KMeansState::Converged`])
///    - **Update step**: recompute every centroid as the mean of its samples.
///      A cluster left without samples keeps its previous centroid.
///
/// Assignments are rebuilt from scratch on each fit, so the first pass
/// always counts as a change. [`n_iter`](KMeans::n_iter) reports how many
/// update steps ran.
///
/// # Errors
///
/// - [`LatticeError::ConstructionError`] if `k == 0` or `n_features == 0`
/// - [`LatticeError::DimensionMismatch`] if data has the wrong number of features
/// - [`LatticeError::InvalidData`] if data is empty, contains non-finite
///   values, or has fewer rows than `k` when centroids are seeded
/// - [`LatticeError::InvalidParameter`] if `max_iters == 0`
///
/// # Example
///
/// ```
/// use lattice_core::Matrix;
/// use lattice_models::k_means::{KMeans, KMeansState};
///
/// let x = Matrix::from_rows(&[&[0.0, 0.0], &[0.0, 1.0], &[10.0, 10.0], &[10.0, 11.0]]).unwrap();
/// let mut km = KMeans::new(2, 2).unwrap();
/// km.fit(&x, 10).unwrap();
/// assert_eq!(km.state(), KMeansState::Converged);
/// assert_eq!(km.assignments(), &[0, 0, 1, 1]);
/// ```
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "KMeansRepr"))]
#[derive(Debug, Clone)]
pub struct KMeans {
    /// Number of clusters.
    k: usize,
    /// Feature dimensionality every input must match.
    n_features: usize,
    /// Cluster centroids of shape `(k, n_features)`.
    centroids: Matrix,
    /// Label of each sample of the most recent fit.
    assignments: Vec<Label>,
    state: KMeansState,
    /// Update steps executed by the most recent fit.
    n_iter: usize,
    config: KMeansConfig,
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct KMeansRepr {
    k: usize,
    n_features: usize,
    centroids: Matrix,
    assignments: Vec<Label>,
    state: KMeansState,
    n_iter: usize,
    config: KMeansConfig,
}

#[cfg(feature = "serde")]
impl TryFrom<KMeansRepr> for KMeans {
    type Error = LatticeError;

    fn try_from(repr: KMeansRepr) -> Result<Self> {
        let mut model = KMeans::with_config(repr.k, repr.n_features, repr.config)?;
        if repr.centroids.shape() != (repr.k, repr.n_features) {
            return Err(LatticeError::shape_mismatch(
                (repr.k, repr.n_features),
                repr.centroids.shape(),
            ));
        }
        if let Some(&label) = repr.assignments.iter().find(|&&l| l >= repr.k) {
            return Err(LatticeError::InvalidData(format!(
                "assignment {label} out of range for {} clusters",
                repr.k
            )));
        }

        model.centroids = repr.centroids;
        model.assignments = repr.assignments;
        model.state = repr.state;
        model.n_iter = repr.n_iter;
        Ok(model)
    }
}

impl KMeans {
    /// Creates an unfitted model with default configuration.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let kmeans = KMeans::new(3, 4)?;
    /// ```
    pub fn new(k: usize, n_features: usize) -> Result<Self> {
        Self::with_config(k, n_features, KMeansConfig::default())
    }

    /// Creates an unfitted model.
    ///
    /// # Errors
    ///
    /// [`LatticeError::ConstructionError`] if `k == 0` or `n_features == 0`.
    pub fn with_config(k: usize, n_features: usize, config: KMeansConfig) -> Result<Self> {
        if k == 0 {
            return Err(LatticeError::ConstructionError(
                "number of clusters must be positive".into(),
            ));
        }
        if n_features == 0 {
            return Err(LatticeError::ConstructionError(
                "number of features must be positive".into(),
            ));
        }

        Ok(Self {
            k,
            n_features,
            centroids: Matrix::zeros(k, n_features)?,
            assignments: Vec::new(),
            state: KMeansState::Uninitialized,
            n_iter: 0,
            config,
        })
    }

    fn check_features<M: MatrixRef + ?Sized>(&self, x: &M) -> Result<()> {
        if x.ncols() != self.n_features {
            return Err(LatticeError::DimensionMismatch {
                expected: format!("{} features", self.n_features),
                got: format!("{} features", x.ncols()),
            });
        }
        Ok(())
    }

    /// Seeds a fresh `(k, n_features)` centroid matrix from `x`.
    fn initial_centroids<M>(&self, x: &M) -> Result<Matrix>
    where
        M: MatrixRef + ?Sized,
    {
        let n = x.nrows();
        let mut centroids = Matrix::zeros(self.k, self.n_features)?;

        match self.config.init {
            Initializer::FirstRows => {
                for c in 0..self.k {
                    centroids.row_mut(c).copy_from_slice(x.row(c));
                }
            }
            Initializer::RandomRows => {
                let mut rng = StdRng::seed_from_u64(self.config.seed);
                let picked = rand::seq::index::sample(&mut rng, n, self.k);
                for (c, i) in picked.into_iter().enumerate() {
                    centroids.row_mut(c).copy_from_slice(x.row(i));
                }
            }
            Initializer::PlusPlus => {
                let mut rng = StdRng::seed_from_u64(self.config.seed);
                let first = rng.random_range(0..n);
                centroids.row_mut(0).copy_from_slice(x.row(first));

                let mut distances = vec![Float::INFINITY; n];
                for c in 1..self.k {
                    // Only the newest centroid can lower a sample's distance.
                    let newest = centroids.row(c - 1);
                    for (i, dist) in distances.iter_mut().enumerate() {
                        *dist = dist.min(squared_euclidean(x.row(i), newest));
                    }

                    let total: Float = distances.iter().sum();
                    let chosen = if total <= 0.0 {
                        // Every sample already coincides with a centroid.
                        rng.random_range(0..n)
                    } else {
                        let mut threshold = rng.random::<Float>() * total;
                        let mut chosen = distances.iter().rposition(|&d| d > 0.0).unwrap_or(0);
                        for (i, &d) in distances.iter().enumerate() {
                            threshold -= d;
                            if threshold <= 0.0 && d > 0.0 {
                                chosen = i;
                                break;
                            }
                        }
                        chosen
                    };
                    centroids.row_mut(c).copy_from_slice(x.row(chosen));
                }
            }
        }

        debug!(init = ?self.config.init, k = self.k, "seeded centroids");
        Ok(centroids)
    }

    /// Recomputes every centroid as the mean of its assigned samples.
    ///
    /// `sums` is caller-provided `(k, n_features)` scratch space. Returns the
    /// number of clusters that received no samples; those keep their
    /// previous centroid.
    fn update_centroids<M>(&mut self, x: &M, assignments: &[Label], sums: &mut Matrix) -> usize
    where
        M: MatrixRef + ?Sized,
    {
        lattice_core::ops::fill(sums, 0.0);
        let mut counts = vec![0usize; self.k];

        for (i, &cluster) in assignments.iter().enumerate() {
            for (s, &v) in sums.row_mut(cluster).iter_mut().zip(x.row(i)) {
                *s += v;
            }
            counts[cluster] += 1;
        }

        let mut empty = 0;
        for (c, &count) in counts.iter().enumerate() {
            if count == 0 {
                warn!(cluster = c, "empty cluster keeps its previous centroid");
                empty += 1;
                continue;
            }
            let count_f = count as Float;
            for (dst, &s) in self.centroids.row_mut(c).iter_mut().zip(sums.row(c)) {
                *dst = s / count_f;
            }
        }
        empty
    }

    /// Fits the model on `x` for at most `max_iters` Lloyd iterations.
    ///
    /// On success the centroids hold the final cluster means and
    /// [`assignments`](KMeans::assignments) holds the labels of the last
    /// assignment step. On error the model is left as it was.
    ///
    /// # Errors
    ///
    /// - [`LatticeError::DimensionMismatch`] if `x.ncols() != n_features`
    /// - [`LatticeError::InvalidData`] if `x` is empty, holds `NaN`/`inf`,
    ///   or has fewer than `k` rows while the centroids need seeding
    /// - [`LatticeError::InvalidParameter`] if `max_iters == 0`
    ///
    /// # Complexity
    ///
    /// `O(max_iters * n * k * d)`, dominated by the assignment step.
    pub fn fit<M>(&mut self, x: &M, max_iters: usize) -> Result<()>
    where
        M: MatrixRef + Sync + ?Sized,
    {
        self.check_features(x)?;
        let n = x.nrows();
        if n == 0 {
            return Err(LatticeError::InvalidData("dataset has no samples".into()));
        }
        if max_iters == 0 {
            return Err(LatticeError::InvalidParameter(
                "max_iters must be positive".into(),
            ));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(LatticeError::InvalidData(
                "dataset contains non-finite values".into(),
            ));
        }

        let reseed = !self.config.warm_start || !self.is_fitted();
        if reseed && n < self.k {
            return Err(LatticeError::InvalidData(format!(
                "cannot seed {} centroids from {n} samples",
                self.k
            )));
        }

        let mut sums = Matrix::zeros(self.k, self.n_features)?;
        if reseed {
            self.centroids = self.initial_centroids(x)?;
        }

        self.state = KMeansState::Fitting;
        self.n_iter = 0;
        let mut previous = vec![UNASSIGNED; n];
        let mut converged = false;

        for iter in 0..max_iters {
            let current = assign_clusters(x, &self.centroids);
            let changed = current
                .iter()
                .zip(&previous)
                .filter(|(a, b)| a != b)
                .count();
            previous = current;

            if changed == 0 {
                converged = true;
                break;
            }

            let empty = self.update_centroids(x, &previous, &mut sums);
            self.n_iter += 1;
            debug!(
                iteration = iter + 1,
                changed,
                empty_clusters = empty,
                "k-means iteration"
            );
        }

        self.assignments = previous;
        self.state = if converged {
            KMeansState::Converged
        } else {
            KMeansState::MaxIterReached
        };
        info!(
            state = ?self.state,
            iterations = self.n_iter,
            samples = n,
            k = self.k,
            "k-means fit finished"
        );
        Ok(())
    }

    /// Labels each row of `x` with its nearest centroid.
    ///
    /// Uses the same metric and tie-break as the assignment step and does
    /// not touch the model. Returns an `(n_queries, 1)` matrix of labels.
    ///
    /// # Errors
    ///
    /// - [`LatticeError::DimensionMismatch`] if `x.ncols() != n_features`
    ///
    /// # Complexity
    ///
    /// - Time: `O(n_queries * k * d)`
    /// - Space: `O(n_queries)`
    pub fn predict<M>(&self, x: &M) -> Result<Matrix>
    where
        M: MatrixRef + Sync + ?Sized,
    {
        self.check_features(x)?;
        let labels = assign_clusters(x, &self.centroids);
        Matrix::from_vec(
            x.nrows(),
            1,
            labels.into_iter().map(|l| l as Float).collect(),
        )
    }

    /// Sum of squared distances from each row of `x` to its nearest centroid.
    pub fn inertia<M>(&self, x: &M) -> Result<Float>
    where
        M: MatrixRef + ?Sized,
    {
        self.check_features(x)?;
        Ok((0..x.nrows())
            .map(|i| nearest_centroid(x.row(i), &self.centroids).1)
            .sum())
    }

    /// Cluster centroids, shape `(k, n_features)`.
    pub fn centroids(&self) -> &Matrix {
        &self.centroids
    }

    /// Labels of the most recently fitted dataset (empty before any fit).
    pub fn assignments(&self) -> &[Label] {
        &self.assignments
    }

    pub fn state(&self) -> KMeansState {
        self.state
    }

    /// Number of update steps executed by the most recent fit.
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    pub fn is_fitted(&self) -> bool {
        matches!(
            self.state,
            KMeansState::Converged | KMeansState::MaxIterReached
        )
    }

    /// Returns the number of clusters.
    pub fn k(&self) -> usize {
        self.k
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn config(&self) -> &KMeansConfig {
        &self.config
    }
}

#[inline]
fn squared_euclidean(a: &[Float], b: &[Float]) -> Float {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let diff = x - y;
            diff * diff
        })
        .sum()
}

/// Index of and squared distance to the closest centroid. Strict `<` keeps
/// the lowest index on ties.
fn nearest_centroid(sample: &[Float], centroids: &Matrix) -> (Label, Float) {
    let mut best_cluster = 0;
    let mut min_dist2 = Float::INFINITY;
    for c in 0..centroids.nrows() {
        let d2 = squared_euclidean(sample, centroids.row(c));
        if d2 < min_dist2 {
            min_dist2 = d2;
            best_cluster = c;
        }
    }
    (best_cluster, min_dist2)
}

/// Assignment step over every row of `x`. Reads `centroids` only.
fn assign_clusters<M>(x: &M, centroids: &Matrix) -> Vec<Label>
where
    M: MatrixRef + Sync + ?Sized,
{
    #[cfg(feature = "parallel")]
    {
        (0..x.nrows())
            .into_par_iter()
            .map(|i| nearest_centroid(x.row(i), centroids).0)
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        (0..x.nrows())
            .map(|i| nearest_centroid(x.row(i), centroids).0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn matrix_from_vec(data: Vec<Vec<f64>>) -> Matrix {
        let rows = data.len();
        let cols = data[0].len();
        Matrix::from_fn(rows, cols, |i, j| data[i][j]).unwrap()
    }

    fn four_points() -> Matrix {
        matrix_from_vec(vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![10.0, 10.0],
            vec![10.0, 11.0],
        ])
    }

    fn labels(m: &Matrix) -> Vec<Label> {
        m.iter().map(|l| l as Label).collect()
    }

    #[test]
    fn test_kmeans_new() {
        let kmeans = KMeans::new(3, 4).unwrap();
        assert_eq!(kmeans.k(), 3);
        assert_eq!(kmeans.n_features(), 4);
        assert_eq!(kmeans.centroids().shape(), (3, 4));
        assert!(kmeans.centroids().iter().all(|v| v == 0.0));
        assert!(kmeans.assignments().is_empty());
        assert_eq!(kmeans.state(), KMeansState::Uninitialized);
        assert!(!kmeans.is_fitted());
    }

    #[test]
    fn test_kmeans_construction_errors() {
        assert!(matches!(
            KMeans::new(0, 2),
            Err(LatticeError::ConstructionError(_))
        ));
        assert!(matches!(
            KMeans::new(2, 0),
            Err(LatticeError::ConstructionError(_))
        ));
    }

    #[test]
    fn test_kmeans_four_points_converges() {
        let x = four_points();
        let mut kmeans = KMeans::new(2, 2).unwrap();
        kmeans.fit(&x, 10).unwrap();

        assert_eq!(kmeans.state(), KMeansState::Converged);
        assert!(kmeans.n_iter() <= 2);
        assert_eq!(kmeans.assignments(), &[0, 0, 1, 1]);

        let c = kmeans.centroids();
        assert_abs_diff_eq!(c[(0, 0)], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(c[(0, 1)], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(c[(1, 0)], 10.0, epsilon = 1e-12);
        assert_abs_diff_eq!(c[(1, 1)], 10.5, epsilon = 1e-12);

        let predicted = kmeans.predict(&x).unwrap();
        assert_eq!(predicted.shape(), (4, 1));
        assert_eq!(labels(&predicted), kmeans.assignments());
    }

    #[test]
    fn test_kmeans_stable_initial_partition_takes_one_iteration() {
        let x = matrix_from_vec(vec![
            vec![0.0, 0.0],
            vec![10.0, 10.0],
            vec![0.0, 1.0],
            vec![10.0, 11.0],
        ]);
        let mut kmeans = KMeans::new(2, 2).unwrap();
        kmeans.fit(&x, 10).unwrap();
        assert_eq!(kmeans.state(), KMeansState::Converged);
        assert_eq!(kmeans.n_iter(), 1);
        assert_eq!(kmeans.assignments(), &[0, 1, 0, 1]);
    }

    #[test]
    fn test_kmeans_max_iter_reached() {
        let x = four_points();
        let mut kmeans = KMeans::new(2, 2).unwrap();
        kmeans.fit(&x, 1).unwrap();
        assert_eq!(kmeans.state(), KMeansState::MaxIterReached);
        assert_eq!(kmeans.n_iter(), 1);
        // First pass pulls everything but the seed row towards centroid 1.
        assert_eq!(kmeans.assignments(), &[0, 1, 1, 1]);
        assert!(kmeans.is_fitted());
    }

    #[test]
    fn test_kmeans_empty_cluster_keeps_centroid() {
        // Duplicate seed rows: every sample ties and goes to cluster 0,
        // leaving cluster 1 empty after the first pass.
        let x = matrix_from_vec(vec![vec![5.0, 5.0], vec![5.0, 5.0], vec![20.0, 20.0]]);

        let mut kmeans = KMeans::new(2, 2).unwrap();
        kmeans.fit(&x, 1).unwrap();
        assert_eq!(kmeans.assignments(), &[0, 0, 0]);
        assert_eq!(kmeans.centroids().row(0), &[10.0, 10.0]);
        assert_eq!(kmeans.centroids().row(1), &[5.0, 5.0]);

        kmeans.fit(&x, 10).unwrap();
        assert_eq!(kmeans.state(), KMeansState::Converged);
        assert_eq!(kmeans.assignments(), &[1, 1, 0]);
        assert_eq!(kmeans.centroids().row(0), &[20.0, 20.0]);
        assert_eq!(kmeans.centroids().row(1), &[5.0, 5.0]);
    }

    #[test]
    fn test_kmeans_shape_mismatch() {
        let mut kmeans = KMeans::new(2, 2).unwrap();
        let x = matrix_from_vec(vec![vec![1.0], vec![2.0]]);
        assert!(matches!(
            kmeans.fit(&x, 10),
            Err(LatticeError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            kmeans.predict(&x),
            Err(LatticeError::DimensionMismatch { .. })
        ));
        assert_eq!(kmeans.state(), KMeansState::Uninitialized);
    }

    #[test]
    fn test_kmeans_k_greater_than_n() {
        let mut kmeans = KMeans::new(5, 2).unwrap();
        let x = matrix_from_vec(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        assert!(matches!(
            kmeans.fit(&x, 10),
            Err(LatticeError::InvalidData(_))
        ));
    }

    #[test]
    fn test_kmeans_zero_max_iters() {
        let mut kmeans = KMeans::new(2, 2).unwrap();
        assert!(matches!(
            kmeans.fit(&four_points(), 0),
            Err(LatticeError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_kmeans_with_nan_leaves_model_untouched() {
        let mut kmeans = KMeans::new(2, 2).unwrap();
        kmeans.fit(&four_points(), 10).unwrap();
        let before = kmeans.centroids().clone();

        let x = matrix_from_vec(vec![vec![1.0, 2.0], vec![f64::NAN, 4.0]]);
        assert!(matches!(
            kmeans.fit(&x, 10),
            Err(LatticeError::InvalidData(_))
        ));
        assert_eq!(kmeans.centroids(), &before);
        assert_eq!(kmeans.assignments().len(), 4);
        assert_eq!(kmeans.state(), KMeansState::Converged);
    }

    #[test]
    fn test_kmeans_predict_before_fit_is_all_zero() {
        let kmeans = KMeans::new(3, 2).unwrap();
        let predicted = kmeans.predict(&four_points()).unwrap();
        assert!(predicted.iter().all(|l| l == 0.0));
    }

    #[test]
    fn test_kmeans_predict_does_not_mutate() {
        let mut kmeans = KMeans::new(2, 2).unwrap();
        kmeans.fit(&four_points(), 10).unwrap();
        let centroids = kmeans.centroids().clone();
        let assignments = kmeans.assignments().to_vec();

        let queries = matrix_from_vec(vec![vec![9.0, 9.0], vec![1.0, 0.0], vec![5.0, 5.5]]);
        let predicted = kmeans.predict(&queries).unwrap();
        assert_eq!(labels(&predicted), vec![1, 0, 0]);
        assert_eq!(kmeans.centroids(), &centroids);
        assert_eq!(kmeans.assignments(), assignments.as_slice());
    }

    #[test]
    fn test_kmeans_predict_tie_goes_to_lowest_index() {
        let mut kmeans = KMeans::new(2, 1).unwrap();
        let x = matrix_from_vec(vec![vec![0.0], vec![2.0]]);
        kmeans.fit(&x, 10).unwrap();
        let midpoint = matrix_from_vec(vec![vec![1.0]]);
        assert_eq!(kmeans.predict(&midpoint).unwrap()[(0, 0)], 0.0);
    }

    #[test]
    fn test_kmeans_three_clusters() {
        let mut kmeans = KMeans::new(3, 2).unwrap();
        let x = matrix_from_vec(vec![
            vec![0.0, 0.0],
            vec![5.0, 5.0],
            vec![10.0, 10.0],
            vec![0.1, 0.1],
            vec![5.1, 5.1],
            vec![10.1, 10.1],
        ]);
        kmeans.fit(&x, 100).unwrap();

        let assignments = kmeans.assignments();
        assert_eq!(assignments[0], assignments[3]);
        assert_eq!(assignments[1], assignments[4]);
        assert_eq!(assignments[2], assignments[5]);
        assert_ne!(assignments[0], assignments[1]);
        assert_ne!(assignments[0], assignments[2]);
        assert_ne!(assignments[1], assignments[2]);
    }

    #[test]
    fn test_kmeans_1d() {
        let mut kmeans = KMeans::new(2, 1).unwrap();
        let x = matrix_from_vec(vec![
            vec![0.0],
            vec![1.0],
            vec![2.0],
            vec![10.0],
            vec![11.0],
            vec![12.0],
        ]);
        kmeans.fit(&x, 100).unwrap();

        assert_eq!(kmeans.assignments(), &[0, 0, 0, 1, 1, 1]);
        assert_eq!(kmeans.n_iter(), 2);
        assert_eq!(kmeans.centroids().as_slice(), &[1.0, 11.0]);
    }

    #[test]
    fn test_kmeans_single_cluster() {
        let mut kmeans = KMeans::new(1, 2).unwrap();
        let x = matrix_from_vec(vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]);
        kmeans.fit(&x, 100).unwrap();

        assert!(kmeans.assignments().iter().all(|&a| a == 0));
        assert_eq!(kmeans.centroids().as_slice(), &[3.0, 4.0]);
    }

    #[test]
    fn test_kmeans_identical_points() {
        let mut kmeans = KMeans::new(2, 2).unwrap();
        let x = matrix_from_vec(vec![vec![5.0, 5.0]; 4]);
        kmeans.fit(&x, 100).unwrap();

        assert_eq!(kmeans.assignments(), &[0, 0, 0, 0]);
        assert_eq!(kmeans.centroids().as_slice(), &[5.0, 5.0, 5.0, 5.0]);
    }

    #[test]
    fn test_kmeans_refit_recomputes_assignments() {
        let mut kmeans = KMeans::new(2, 2).unwrap();
        kmeans.fit(&four_points(), 10).unwrap();
        assert_eq!(kmeans.assignments().len(), 4);

        let x = matrix_from_vec(vec![
            vec![1.0, 1.0],
            vec![8.0, 8.0],
            vec![1.0, 2.0],
        ]);
        kmeans.fit(&x, 10).unwrap();
        assert_eq!(kmeans.assignments(), &[0, 1, 0]);
        assert_eq!(kmeans.centroids().row(1), &[8.0, 8.0]);
    }

    #[test]
    fn test_kmeans_warm_start_skips_reseeding() {
        let x = four_points();

        let mut cold = KMeans::new(2, 2).unwrap();
        cold.fit(&x, 10).unwrap();
        cold.fit(&x, 10).unwrap();
        assert_eq!(cold.n_iter(), 2);

        let config = KMeansConfig::default().with_warm_start(true);
        let mut warm = KMeans::with_config(2, 2, config).unwrap();
        warm.fit(&x, 10).unwrap();
        warm.fit(&x, 10).unwrap();
        assert_eq!(warm.n_iter(), 1);
        assert_eq!(warm.centroids(), cold.centroids());
    }

    #[test]
    fn test_kmeans_fit_on_view() {
        let padded = matrix_from_vec(vec![
            vec![-1.0, 0.0, 0.0],
            vec![-1.0, 0.0, 1.0],
            vec![-1.0, 10.0, 10.0],
            vec![-1.0, 10.0, 11.0],
            vec![-1.0, 99.0, 99.0],
        ]);
        let x = padded.view(0, 1, 4, 2).unwrap();

        let mut kmeans = KMeans::new(2, 2).unwrap();
        kmeans.fit(&x, 10).unwrap();
        assert_eq!(kmeans.assignments(), &[0, 0, 1, 1]);
        assert_eq!(kmeans.centroids().as_slice(), &[0.0, 0.5, 10.0, 10.5]);
    }

    #[test]
    fn test_kmeans_inertia() {
        let x = four_points();
        let mut kmeans = KMeans::new(2, 2).unwrap();
        kmeans.fit(&x, 10).unwrap();
        assert_abs_diff_eq!(kmeans.inertia(&x).unwrap(), 1.0, epsilon = 1e-12);

        let wrong = matrix_from_vec(vec![vec![1.0]]);
        assert!(kmeans.inertia(&wrong).is_err());
    }

    #[test]
    #[cfg(feature = "parallel")]
    fn test_parallel_assignment_matches_sequential() {
        // Every sample sits on a grid point equidistant from several
        // duplicated centroids, so the lowest-index tie-break decides.
        let centroids = matrix_from_vec(vec![
            vec![0.0, 0.0],
            vec![2.0, 0.0],
            vec![0.0, 0.0],
            vec![0.0, 2.0],
            vec![2.0, 2.0],
            vec![2.0, 0.0],
        ]);
        let x = Matrix::from_fn(500, 2, |i, j| ((i >> j) % 3) as Float).unwrap();

        let sequential: Vec<Label> = (0..x.nrows())
            .map(|i| {
                (0..centroids.nrows()).fold((0, Float::INFINITY), |best, c| {
                    let d2 = squared_euclidean(x.row(i), centroids.row(c));
                    if d2 < best.1 { (c, d2) } else { best }
                })
                .0
            })
            .collect();

        assert_eq!(assign_clusters(&x, &centroids), sequential);
        assert!(!sequential.contains(&2));
        assert!(!sequential.contains(&5));
    }

    fn two_blobs() -> Matrix {
        matrix_from_vec(vec![
            vec![0.0, 0.0],
            vec![0.1, 0.1],
            vec![0.2, 0.2],
            vec![10.0, 10.0],
            vec![10.1, 10.1],
            vec![10.2, 10.2],
        ])
    }

    #[test]
    fn test_kmeans_random_initializers_are_seeded() {
        for init in [Initializer::RandomRows, Initializer::PlusPlus] {
            let config = KMeansConfig::default().with_init(init).with_seed(17);
            let mut a = KMeans::with_config(2, 2, config.clone()).unwrap();
            let mut b = KMeans::with_config(2, 2, config).unwrap();
            a.fit(&two_blobs(), 100).unwrap();
            b.fit(&two_blobs(), 100).unwrap();

            assert_eq!(a.centroids(), b.centroids());
            assert_eq!(a.assignments(), b.assignments());
            assert!(a.assignments().iter().all(|&l| l < 2));
        }
    }

    #[test]
    fn test_kmeans_plusplus_separates_blobs() {
        let config = KMeansConfig::default()
            .with_init(Initializer::PlusPlus)
            .with_seed(3);
        let mut kmeans = KMeans::with_config(2, 2, config).unwrap();
        kmeans.fit(&two_blobs(), 100).unwrap();

        let a = kmeans.assignments();
        assert_eq!(a[0], a[1]);
        assert_eq!(a[1], a[2]);
        assert_eq!(a[3], a[4]);
        assert_eq!(a[4], a[5]);
        assert_ne!(a[0], a[3]);
    }

    #[test]
    #[cfg(feature = "serde")]
    fn test_kmeans_serialize_deserialize_json() {
        let mut kmeans = KMeans::new(2, 2).unwrap();
        kmeans.fit(&two_blobs(), 100).unwrap();

        let serialized = serde_json::to_string(&kmeans).expect("Failed to serialize");
        assert!(!serialized.is_empty());
        let deserialized: KMeans =
            serde_json::from_str(&serialized).expect("Failed to deserialize");

        let x_test = matrix_from_vec(vec![vec![0.0, 0.0], vec![10.0, 10.0]]);
        assert_eq!(
            kmeans.predict(&x_test).unwrap(),
            deserialized.predict(&x_test).unwrap()
        );
        assert_eq!(deserialized.state(), KMeansState::Converged);
        assert_eq!(deserialized.assignments(), kmeans.assignments());
    }

    #[test]
    #[cfg(feature = "serde")]
    fn test_kmeans_deserialize_rejects_inconsistent_model() {
        let mut kmeans = KMeans::new(2, 2).unwrap();
        kmeans.fit(&two_blobs(), 100).unwrap();
        let valid = serde_json::to_value(&kmeans).unwrap();

        // Centroid rows disagree with k.
        let mut bad_centroids = valid.clone();
        bad_centroids["k"] = serde_json::json!(3);
        assert!(serde_json::from_value::<KMeans>(bad_centroids).is_err());

        // Centroid columns disagree with n_features.
        let mut bad_features = valid.clone();
        bad_features["centroids"] =
            serde_json::json!({ "nrows": 2, "ncols": 1, "data": [0.0, 1.0] });
        assert!(serde_json::from_value::<KMeans>(bad_features).is_err());

        // Label outside [0, k).
        let mut bad_label = valid.clone();
        bad_label["assignments"] = serde_json::json!([0, 1, 7]);
        assert!(serde_json::from_value::<KMeans>(bad_label).is_err());

        let mut zero_k = valid.clone();
        zero_k["k"] = serde_json::json!(0);
        assert!(serde_json::from_value::<KMeans>(zero_k).is_err());

        let back: KMeans = serde_json::from_value(valid).unwrap();
        assert_eq!(back.centroids(), kmeans.centroids());
    }

    #[test]
    #[cfg(feature = "serde")]
    fn test_kmeans_config_roundtrip() {
        let config = KMeansConfig::default()
            .with_init(Initializer::PlusPlus)
            .with_warm_start(true)
            .with_seed(99);
        let json = serde_json::to_string(&config).unwrap();
        let back: KMeansConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
