//! CSV input and submission output for the playlist continuation task.
//!
//! Files are small, comma-separated and headed:
//!
//! | file              | columns                                        |
//! |-------------------|------------------------------------------------|
//! | interactions      | `playlist_id,track_id`                         |
//! | track attributes  | `track_id,album_id,artist_id,duration_sec`     |
//! | target playlists  | `playlist_id`                                  |
//! | submission        | `playlist_id,track_ids` (ids space-separated)  |
//!
//! Readers accept any [`Read`] and expect the header row shown above; the
//! `*_file` variants open a path. Fields are trimmed and blank lines skipped.
//!
//! ```
//! use recomendar::data::{build_urm, read_interactions};
//!
//! let csv = "playlist_id,track_id\n0,1\n0,3\n1,0\n";
//! let pairs = read_interactions(csv.as_bytes()).unwrap();
//! let urm = build_urm(&pairs, None, None).unwrap();
//! assert_eq!(urm.shape(), (2, 4));
//! assert_eq!(urm.row(0).indices(), &[1, 3]);
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RecomendarError, Result};
use crate::primitives::{CooMatrix, CsrMatrix};

/// One row of the track attributes file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub track_id: usize,
    pub album_id: usize,
    pub artist_id: usize,
    pub duration_sec: u32,
}

/// All track attribute rows of a catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackAttributes {
    /// Rows in file order
    pub tracks: Vec<TrackRecord>,
}

impl TrackAttributes {
    /// Number of tracks implied by the largest track id.
    #[must_use]
    pub fn n_tracks(&self) -> usize {
        self.tracks.iter().map(|t| t.track_id + 1).max().unwrap_or(0)
    }

    /// One-hot track × attribute matrix: album columns, then artist columns.
    ///
    /// The matrix has `n_items` rows so that it lines up with the URM's
    /// columns; tracks missing from the file get an empty row.
    ///
    /// # Errors
    ///
    /// Returns [`RecomendarError::DimensionMismatch`] if a track id is
    /// `>= n_items`.
    pub fn to_feature_matrix(&self, n_items: usize) -> Result<CsrMatrix> {
        let n_albums = self.tracks.iter().map(|t| t.album_id + 1).max().unwrap_or(0);
        let n_artists = self.tracks.iter().map(|t| t.artist_id + 1).max().unwrap_or(0);

        let mut icm = CooMatrix::new(n_items, n_albums + n_artists);
        for t in &self.tracks {
            if t.track_id >= n_items {
                return Err(RecomendarError::mismatch(
                    format!("track_id < {n_items}"),
                    format!("track_id {}", t.track_id),
                ));
            }
            icm.push(t.track_id, t.album_id, 1.0)?;
            icm.push(t.track_id, n_albums + t.artist_id, 1.0)?;
        }
        let icm = icm.to_csr().binarized();
        debug!(
            tracks = n_items,
            albums = n_albums,
            artists = n_artists,
            "track feature matrix built"
        );
        Ok(icm)
    }
}

/// Binary playlist × track matrix from `(playlist, track)` pairs.
///
/// Shapes default to the largest ids + 1. Duplicate pairs count once.
///
/// # Errors
///
/// Returns [`RecomendarError::DimensionMismatch`] if an explicit shape is too
/// small for the ids.
pub fn build_urm(
    pairs: &[(usize, usize)],
    n_playlists: Option<usize>,
    n_items: Option<usize>,
) -> Result<CsrMatrix> {
    let nrows = n_playlists.unwrap_or_else(|| pairs.iter().map(|&(p, _)| p + 1).max().unwrap_or(0));
    let ncols = n_items.unwrap_or_else(|| pairs.iter().map(|&(_, t)| t + 1).max().unwrap_or(0));

    let urm = CooMatrix::from_triplets(nrows, ncols, pairs.iter().map(|&(p, t)| (p, t, 1.0)))?
        .to_csr()
        .binarized();
    debug!(
        playlists = nrows,
        tracks = ncols,
        nnz = urm.nnz(),
        density = urm.density(),
        "interaction matrix built"
    );
    Ok(urm)
}

/// Reads `playlist_id,track_id` rows.
///
/// # Errors
///
/// Returns [`RecomendarError::Parse`] for a malformed line or
/// [`RecomendarError::Io`] on read failure.
pub fn read_interactions<R: Read>(reader: R) -> Result<Vec<(usize, usize)>> {
    deserialize_rows(reader)
}

/// Reads `track_id,album_id,artist_id,duration_sec` rows.
///
/// # Errors
///
/// Same as [`read_interactions`].
pub fn read_track_attributes<R: Read>(reader: R) -> Result<TrackAttributes> {
    let tracks = deserialize_rows(reader)?;
    Ok(TrackAttributes { tracks })
}

/// Reads one `playlist_id` per row.
///
/// # Errors
///
/// Same as [`read_interactions`].
pub fn read_target_playlists<R: Read>(reader: R) -> Result<Vec<usize>> {
    let rows: Vec<(usize,)> = deserialize_rows(reader)?;
    Ok(rows.into_iter().map(|(playlist,)| playlist).collect())
}

/// [`read_interactions`] on a file.
///
/// # Errors
///
/// Returns [`RecomendarError::Io`] if the file cannot be opened.
pub fn read_interactions_file<P: AsRef<Path>>(path: P) -> Result<Vec<(usize, usize)>> {
    read_interactions(open(path)?)
}

/// [`read_track_attributes`] on a file.
///
/// # Errors
///
/// Returns [`RecomendarError::Io`] if the file cannot be opened.
pub fn read_track_attributes_file<P: AsRef<Path>>(path: P) -> Result<TrackAttributes> {
    read_track_attributes(open(path)?)
}

/// [`read_target_playlists`] on a file.
///
/// # Errors
///
/// Returns [`RecomendarError::Io`] if the file cannot be opened.
pub fn read_target_playlists_file<P: AsRef<Path>>(path: P) -> Result<Vec<usize>> {
    read_target_playlists(open(path)?)
}

/// Writes `playlist_id,track_ids` with space-joined track ids.
///
/// # Examples
///
/// ```
/// use recomendar::data::write_submission;
///
/// let mut out = Vec::new();
/// write_submission(&mut out, &[(7, vec![3, 1, 2])]).unwrap();
/// assert_eq!(String::from_utf8(out).unwrap(), "playlist_id,track_ids\n7,3 1 2\n");
/// ```
///
/// # Errors
///
/// Returns [`RecomendarError::Io`] on write failure.
pub fn write_submission<W: Write>(writer: W, rows: &[(usize, Vec<usize>)]) -> Result<()> {
    let mut out = BufWriter::new(writer);
    writeln!(out, "playlist_id,track_ids")?;
    for (playlist, tracks) in rows {
        let ids: Vec<String> = tracks.iter().map(ToString::to_string).collect();
        writeln!(out, "{playlist},{}", ids.join(" "))?;
    }
    out.flush()?;
    Ok(())
}

/// [`write_submission`] to a new file at `path`.
///
/// # Errors
///
/// Returns [`RecomendarError::Io`] if the file cannot be created or written.
pub fn write_submission_file<P: AsRef<Path>>(path: P, rows: &[(usize, Vec<usize>)]) -> Result<()> {
    write_submission(File::create(path)?, rows)
}

fn open<P: AsRef<Path>>(path: P) -> Result<BufReader<File>> {
    Ok(BufReader::new(File::open(path)?))
}

/// Deserializes every record after the header row.
fn deserialize_rows<R, T>(reader: R) -> Result<Vec<T>>
where
    R: Read,
    T: DeserializeOwned,
{
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    reader
        .deserialize()
        .map(|row| row.map_err(csv_error))
        .collect()
}

/// Maps a csv error to [`RecomendarError::Parse`] at its 1-based line.
fn csv_error(err: csv::Error) -> RecomendarError {
    let line = err
        .position()
        .map_or(0, |pos| usize::try_from(pos.line()).unwrap_or(usize::MAX));
    let message = match err.kind() {
        csv::ErrorKind::Deserialize { err, .. } => err.to_string(),
        csv::ErrorKind::UnequalLengths {
            expected_len, len, ..
        } => format!("expected {expected_len} fields, found {len}"),
        _ => err.to_string(),
    };
    match err.into_kind() {
        csv::ErrorKind::Io(io) => RecomendarError::Io(io),
        _ => RecomendarError::Parse { line, message },
    }
}

#[cfg(test)]
#[path = "data_tests.rs"]
mod tests;
