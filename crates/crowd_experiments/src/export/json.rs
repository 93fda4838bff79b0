use crate::error::ExperimentError;
use crate::metrics::SimulationResult;

pub(crate) fn export_results_json_impl(
    results: &[SimulationResult],
    file: std::fs::File,
) -> Result<(), ExperimentError> {
    serde_json::to_writer_pretty(file, results)?;
    Ok(())
}
