//! Subcommand implementations and the input loading they share.

pub(crate) mod evaluate;
pub(crate) mod predict;

use std::fs;
use std::path::Path;

use recomendar::data::{build_urm, read_interactions_file, read_track_attributes_file};
use recomendar::ensemble::EnsembleConfig;
use recomendar::recommend::ModelKind;
use recomendar::CsrMatrix;
use tracing::{info, warn};

use crate::error::{CliError, Result};

/// Interaction matrix plus optional track features, aligned on track ids.
pub(crate) struct Dataset {
    pub(crate) urm: CsrMatrix,
    pub(crate) features: Option<CsrMatrix>,
}

/// Reads the interactions (and the track attributes, when given).
///
/// The URM has at least `min_playlists` rows and one column per track id seen
/// in either file.
pub(crate) fn load_dataset(
    interactions: &Path,
    tracks: Option<&Path>,
    min_playlists: usize,
) -> Result<Dataset> {
    let pairs = read_interactions_file(require_file(interactions)?)?;
    let attributes = tracks
        .map(|path| read_track_attributes_file(require_file(path)?).map_err(CliError::from))
        .transpose()?;

    let n_playlists = pairs
        .iter()
        .map(|&(p, _)| p + 1)
        .max()
        .unwrap_or(0)
        .max(min_playlists);
    let n_items = pairs
        .iter()
        .map(|&(_, t)| t + 1)
        .max()
        .unwrap_or(0)
        .max(attributes.as_ref().map_or(0, |a| a.n_tracks()));

    let urm = build_urm(&pairs, Some(n_playlists), Some(n_items))?;
    let features = attributes
        .map(|a| a.to_feature_matrix(n_items))
        .transpose()?;

    info!(
        playlists = n_playlists,
        tracks = n_items,
        interactions = urm.nnz(),
        features = features.as_ref().map_or(0, CsrMatrix::ncols),
        "dataset loaded"
    );
    Ok(Dataset { urm, features })
}

/// Loads an ensemble configuration from JSON, or the default five-slot ensemble.
///
/// Without track attributes the default ensemble runs with its content-based
/// slot disabled. An explicit configuration is used as written.
pub(crate) fn load_config(path: Option<&Path>, has_tracks: bool) -> Result<EnsembleConfig> {
    let Some(path) = path else {
        return Ok(default_config(has_tracks));
    };
    let text = fs::read_to_string(require_file(path)?)?;
    let config: EnsembleConfig =
        serde_json::from_str(&text).map_err(|e| CliError::InvalidConfig {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    config.validate()?;
    Ok(config)
}

fn default_config(has_tracks: bool) -> EnsembleConfig {
    let mut config = EnsembleConfig::default();
    if !has_tracks {
        for slot in &mut config.slots {
            if slot.model.kind() == ModelKind::ContentBased {
                slot.weight = 0.0;
            }
        }
        warn!("no track attributes given (--tracks); content-based slot disabled");
    }
    config
}

fn require_file(path: &Path) -> Result<&Path> {
    if path.is_file() {
        Ok(path)
    } else {
        Err(CliError::FileNotFound(path.to_path_buf()))
    }
}
