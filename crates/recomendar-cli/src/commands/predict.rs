//! Predict command: fit on all interactions and write a submission file.

use std::path::Path;

use recomendar::data::{read_target_playlists_file, write_submission_file};
use tracing::info;

use super::{load_config, load_dataset, require_file};
use crate::error::Result;

/// Options of the predict command
pub(crate) struct PredictArgs<'a> {
    pub(crate) interactions: &'a Path,
    pub(crate) targets: &'a Path,
    pub(crate) tracks: Option<&'a Path>,
    pub(crate) config: Option<&'a Path>,
    pub(crate) output: &'a Path,
    pub(crate) save_model: Option<&'a Path>,
}

/// Run the predict command
pub(crate) fn run(args: &PredictArgs<'_>) -> Result<()> {
    let config = load_config(args.config, args.tracks.is_some())?;
    let targets = read_target_playlists_file(require_file(args.targets)?)?;
    // targets without interactions get an empty row
    let min_playlists = targets.iter().map(|&p| p + 1).max().unwrap_or(0);
    let dataset = load_dataset(args.interactions, args.tracks, min_playlists)?;

    let ensemble = config.fit(dataset.urm, dataset.features.as_ref())?;
    if let Some(path) = args.save_model {
        ensemble.save(path)?;
        info!(path = %path.display(), "model saved");
    }

    let lists = ensemble.recommend_batch(&targets)?;
    let rows: Vec<(usize, Vec<usize>)> = targets.into_iter().zip(lists).collect();
    write_submission_file(args.output, &rows)?;

    println!(
        "Wrote {} recommendations to {}",
        rows.len(),
        args.output.display()
    );
    Ok(())
}
