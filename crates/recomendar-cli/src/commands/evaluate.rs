//! Evaluate command: holdout MAP@K of an ensemble configuration.

use std::path::Path;

use recomendar::model_selection::{evaluate_map, Holdout};
use recomendar::{RecomendarError, Recommend};
use tracing::info;

use super::{load_config, load_dataset};
use crate::error::Result;

/// Options of the evaluate command
pub(crate) struct EvaluateArgs<'a> {
    pub(crate) interactions: &'a Path,
    pub(crate) tracks: Option<&'a Path>,
    pub(crate) config: Option<&'a Path>,
    pub(crate) holdout: Holdout,
    pub(crate) k: usize,
    pub(crate) json: bool,
}

/// Run the evaluate command
pub(crate) fn run(args: &EvaluateArgs<'_>) -> Result<()> {
    let config = load_config(args.config, args.tracks.is_some())?;
    let dataset = load_dataset(args.interactions, args.tracks, 0)?;

    let split = args.holdout.split(&dataset.urm)?;
    let ensemble = config.fit(split.train.clone(), dataset.features.as_ref())?;
    info!(
        playlists = ensemble.n_playlists(),
        hidden = split.test.nnz(),
        "scoring holdout"
    );

    let metrics = evaluate_map(&ensemble, &split, args.k)?;
    if args.json {
        let json = serde_json::to_string_pretty(&metrics).map_err(RecomendarError::from)?;
        println!("{json}");
    } else {
        println!("{}", metrics.report());
    }
    Ok(())
}
