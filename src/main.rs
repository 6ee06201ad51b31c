use lattice::{Initializer, KMeans, KMeansConfig, Matrix, MatrixRef, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Two noisy blobs in the unit square.
    let mut rng = StdRng::seed_from_u64(42);
    let centers = [[0.25, 0.25], [0.75, 0.7]];
    let data = Matrix::from_fn(40, 2, |i, j| {
        centers[i % 2][j] + rng.random_range(-0.1..0.1)
    })?;

    let config = KMeansConfig::default().with_init(Initializer::FirstRows);
    let mut km = KMeans::with_config(2, data.ncols(), config)?;
    km.fit(&data, 100)?;

    let labels = km.predict(&data)?;
    info!(state = ?km.state(), iterations = km.n_iter(), "clustering done");
    info!(inertia = km.inertia(&data)?, "within-cluster sum of squares");
    println!("centroids:\n{:.3}", km.centroids());
    println!("first labels: {:?}", labels.iter().take(10).collect::<Vec<_>>());
    Ok(())
}
