use crowd_sim::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum ExperimentError {
    #[error("run {run_id} of {experiment_id}: {source}")]
    Config {
        experiment_id: String,
        run_id: usize,
        #[source]
        source: ConfigError,
    },

    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("no results to export")]
    NoResults,

    #[error("results length ({results}) doesn't match parameter sets length ({parameter_sets})")]
    LengthMismatch { results: usize, parameter_sets: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
