//! Result export: sweep results to CSV/JSON, per-tick metrics to CSV.

use std::path::Path;

use crate::error::ExperimentError;
use crate::metrics::SimulationResult;
use crate::parameters::ParameterSet;

#[path = "export/csv.rs"]
mod csv;
#[path = "export/json.rs"]
mod json;
#[path = "export/writer_utils.rs"]
mod writer_utils;

pub use self::csv::CsvMetricsSink;

/// Export results paired with their parameter sets to CSV, one row per run.
///
/// # Errors
///
/// Fails on empty input, mismatched lengths, or I/O and CSV errors.
pub fn export_results_csv(
    results: &[SimulationResult],
    parameter_sets: &[ParameterSet],
    path: impl AsRef<Path>,
) -> Result<(), ExperimentError> {
    writer_utils::ensure_not_empty(results)?;
    if results.len() != parameter_sets.len() {
        return Err(ExperimentError::LengthMismatch {
            results: results.len(),
            parameter_sets: parameter_sets.len(),
        });
    }
    let file = writer_utils::create_output_file(path)?;
    csv::export_results_csv_impl(results, parameter_sets, file)
}

/// Export results to a pretty-printed JSON array.
///
/// # Errors
///
/// Fails on I/O or serialization errors.
pub fn export_results_json(
    results: &[SimulationResult],
    path: impl AsRef<Path>,
) -> Result<(), ExperimentError> {
    let file = writer_utils::create_output_file(path)?;
    json::export_results_json_impl(results, file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::ParameterSpace;
    use crate::runner::run_single_simulation;
    use tempfile::NamedTempFile;

    fn one_run() -> (Vec<SimulationResult>, Vec<ParameterSet>) {
        let sets = ParameterSpace::grid().num_workers(vec![3]).num_tasks(vec![10]).generate();
        let results = vec![run_single_simulation(&sets[0]).expect("run")];
        (results, sets)
    }

    #[test]
    fn test_export_results_json() {
        let (results, _) = one_run();
        let file = NamedTempFile::new().expect("temp file");
        export_results_json(&results, file.path()).expect("export");

        let contents = std::fs::read_to_string(file.path()).expect("read");
        assert!(contents.contains("completion_rate"));
        assert!(contents.contains("jain_fairness"));
    }

    #[test]
    fn test_export_results_csv() {
        let (results, sets) = one_run();
        let file = NamedTempFile::new().expect("temp file");
        export_results_csv(&results, &sets, file.path()).expect("export");

        let contents = std::fs::read_to_string(file.path()).expect("read");
        let mut lines = contents.lines();
        let header = lines.next().expect("header");
        assert!(header.starts_with("experiment_id,run_id,seed,policy"));
        assert_eq!(lines.count(), 1);
    }

    #[test]
    fn test_export_rejects_empty_and_mismatched_input() {
        let file = NamedTempFile::new().expect("temp file");
        assert!(matches!(
            export_results_csv(&[], &[], file.path()),
            Err(ExperimentError::NoResults)
        ));
        let (results, _) = one_run();
        assert!(matches!(
            export_results_csv(&results, &[], file.path()),
            Err(ExperimentError::LengthMismatch { .. })
        ));
    }
}
