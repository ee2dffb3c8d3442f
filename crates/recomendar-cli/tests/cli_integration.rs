//! CLI integration tests for the recomendar binary.

#![allow(clippy::unwrap_used)]

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// ============================================================================
// Helper Functions
// ============================================================================

fn recomendar() -> Command {
    Command::cargo_bin("recomendar").expect("Failed to find recomendar binary")
}

/// Two communities of tracks: playlists 0..10 use 0..6, playlists 10..20 use 6..12.
fn write_inputs(dir: &Path) {
    let mut train = String::from("playlist_id,track_id\n");
    for p in 0..20 {
        let base = if p < 10 { 0 } else { 6 };
        for o in 0..4 {
            train.push_str(&format!("{p},{}\n", base + (p + o) % 6));
        }
    }
    fs::write(dir.join("train.csv"), train).unwrap();

    let mut tracks = String::from("track_id,album_id,artist_id,duration_sec\n");
    for t in 0..12 {
        tracks.push_str(&format!("{t},{},{},{}\n", t / 3, t / 6, 180 + t));
    }
    fs::write(dir.join("tracks.csv"), tracks).unwrap();

    fs::write(dir.join("targets.csv"), "playlist_id\n0\n15\n").unwrap();

    fs::write(
        dir.join("item_cf.json"),
        r#"{"slots": [{"weight": 1.0, "model": {"model": "item_cf", "k": 10}}]}"#,
    )
    .unwrap();
}

fn setup() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_inputs(dir.path());
    dir
}

// ============================================================================
// Help
// ============================================================================

#[test]
fn test_help_lists_subcommands() {
    recomendar()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("evaluate"))
        .stdout(predicate::str::contains("predict"));
}

#[test]
fn test_version() {
    recomendar()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("recomendar"));
}

// ============================================================================
// Evaluate
// ============================================================================

#[test]
fn test_evaluate_prints_report() {
    let dir = setup();
    recomendar()
        .current_dir(dir.path())
        .args(["evaluate", "-i", "train.csv", "-c", "item_cf.json", "--seed", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("MAP"));
}

#[test]
fn test_evaluate_json_output() {
    let dir = setup();
    let output = recomendar()
        .current_dir(dir.path())
        .args(["evaluate", "-i", "train.csv", "-c", "item_cf.json", "--json", "-k", "5"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let metrics: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(metrics["k"], 5);
    assert_eq!(metrics["n_playlists"], 10);
    let map = metrics["map"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&map));
}

#[test]
fn test_evaluate_default_ensemble_with_tracks() {
    let dir = setup();
    recomendar()
        .current_dir(dir.path())
        .args(["evaluate", "-i", "train.csv", "-t", "tracks.csv", "-q"])
        .assert()
        .success()
        .stdout(predicate::str::contains("MAP"));
}

#[test]
fn test_evaluate_default_ensemble_without_tracks_skips_content() {
    let dir = setup();
    recomendar()
        .current_dir(dir.path())
        .env_remove("RUST_LOG")
        .args(["evaluate", "-i", "train.csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("MAP"))
        .stderr(predicate::str::contains("content-based slot disabled"));
}

#[test]
fn test_evaluate_explicit_content_config_needs_tracks() {
    let dir = setup();
    fs::write(
        dir.path().join("content.json"),
        r#"{"slots": [{"weight": 1.0, "model": {"model": "content_based"}}]}"#,
    )
    .unwrap();
    recomendar()
        .current_dir(dir.path())
        .args(["evaluate", "-i", "train.csv", "-c", "content.json", "-q"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_evaluate_missing_file() {
    recomendar()
        .args(["evaluate", "-i", "/nonexistent/train.csv"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn test_evaluate_malformed_interactions() {
    let dir = setup();
    fs::write(dir.path().join("bad.csv"), "playlist_id,track_id\n0,1\n0,abc\n").unwrap();
    recomendar()
        .current_dir(dir.path())
        .args(["evaluate", "-i", "bad.csv", "-c", "item_cf.json"])
        .assert()
        .failure()
        .code(4)
        .stderr(predicate::str::contains("line 3"));
}

#[test]
fn test_evaluate_invalid_config() {
    let dir = setup();
    fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
    recomendar()
        .current_dir(dir.path())
        .args(["evaluate", "-i", "train.csv", "-c", "broken.json"])
        .assert()
        .failure()
        .code(4)
        .stderr(predicate::str::contains("Invalid config"));
}

#[test]
fn test_evaluate_rejects_bad_fraction() {
    let dir = setup();
    recomendar()
        .current_dir(dir.path())
        .args([
            "evaluate",
            "-i",
            "train.csv",
            "-c",
            "item_cf.json",
            "--test-fraction",
            "2.0",
        ])
        .assert()
        .failure()
        .code(5);
}

// ============================================================================
// Predict
// ============================================================================

#[test]
fn test_predict_writes_submission() {
    let dir = setup();
    recomendar()
        .current_dir(dir.path())
        .args([
            "predict",
            "-i",
            "train.csv",
            "--targets",
            "targets.csv",
            "-c",
            "item_cf.json",
            "-o",
            "submission.csv",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 2 recommendations"));

    let text = fs::read_to_string(dir.path().join("submission.csv")).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "playlist_id,track_ids");
    assert_eq!(lines.len(), 3);

    // playlist 0 holds tracks 0..4: its own community comes first, then zero scores
    let (id, tracks) = lines[1].split_once(',').unwrap();
    assert_eq!(id, "0");
    let mut tracks: Vec<usize> = tracks.split(' ').map(|t| t.parse().unwrap()).collect();
    assert_eq!(tracks.len(), 8);
    tracks[..2].sort_unstable();
    assert_eq!(&tracks[..2], &[4, 5]);
    assert_eq!(&tracks[2..], &[6, 7, 8, 9, 10, 11]);
    assert!(lines[2].starts_with("15,"));
}

#[test]
fn test_predict_saves_loadable_model() {
    let dir = setup();
    recomendar()
        .current_dir(dir.path())
        .args([
            "predict",
            "-i",
            "train.csv",
            "--targets",
            "targets.csv",
            "-c",
            "item_cf.json",
            "--save-model",
            "model.bin",
            "-q",
        ])
        .assert()
        .success();

    let model = recomendar::ensemble::TrainedEnsemble::load(dir.path().join("model.bin")).unwrap();
    assert_eq!(model.urm().shape(), (20, 12));
}

#[test]
fn test_predict_target_without_interactions() {
    let dir = setup();
    fs::write(dir.path().join("targets.csv"), "playlist_id\n25\n").unwrap();
    recomendar()
        .current_dir(dir.path())
        .args([
            "predict",
            "-i",
            "train.csv",
            "--targets",
            "targets.csv",
            "-c",
            "item_cf.json",
        ])
        .assert()
        .success();

    let text = fs::read_to_string(dir.path().join("submission.csv")).unwrap();
    // nothing to go on: every score ties at zero
    assert_eq!(text, "playlist_id,track_ids\n25,0 1 2 3 4 5 6 7 8 9\n");
}
