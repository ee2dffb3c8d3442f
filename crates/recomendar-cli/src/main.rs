//! recomendar - playlist continuation from the command line
//!
//! Usage:
//!   recomendar evaluate -i train.csv -t tracks.csv            # Holdout MAP@10 of the default ensemble
//!   recomendar evaluate -i train.csv -c ensemble.json --json  # Custom ensemble, JSON metrics
//!   recomendar evaluate -i train.csv                          # Default ensemble minus the content slot
//!   recomendar predict -i train.csv -t tracks.csv \
//!       --targets target_playlists.csv -o submission.csv      # Write a submission file
//!
//! Logging goes to stderr and follows `RUST_LOG`; `--verbose` raises it to debug.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use recomendar::model_selection::Holdout;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;

use commands::evaluate::{self, EvaluateArgs};
use commands::predict::{self, PredictArgs};

/// recomendar - Playlist Continuation Tool
///
/// Fit similarity and SLIM-BPR ensembles on playlist/track interactions,
/// evaluate them offline and produce top-10 submissions.
#[derive(Parser)]
#[command(name = "recomendar")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Hold out part of the interactions and report MAP@K
    Evaluate {
        /// Interactions CSV (playlist_id,track_id)
        #[arg(short, long, value_name = "FILE")]
        interactions: PathBuf,

        /// Track attributes CSV (track_id,album_id,artist_id,duration_sec)
        #[arg(short, long, value_name = "FILE")]
        tracks: Option<PathBuf>,

        /// Ensemble configuration JSON (default: five-slot playlist ensemble)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Share of playlists that get hidden tracks
        #[arg(long, default_value = "0.5")]
        playlist_fraction: f32,

        /// Share of a selected playlist's tracks that are hidden
        #[arg(long, default_value = "0.2")]
        test_fraction: f32,

        /// Seed of the holdout split
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Cutoff of the ranking metrics
        #[arg(short, long, default_value = "10")]
        k: usize,
    },

    /// Fit on all interactions and write recommendations for target playlists
    Predict {
        /// Interactions CSV (playlist_id,track_id)
        #[arg(short, long, value_name = "FILE")]
        interactions: PathBuf,

        /// Target playlists CSV (playlist_id)
        #[arg(long, value_name = "FILE")]
        targets: PathBuf,

        /// Track attributes CSV (track_id,album_id,artist_id,duration_sec)
        #[arg(short, long, value_name = "FILE")]
        tracks: Option<PathBuf>,

        /// Ensemble configuration JSON (default: five-slot playlist ensemble)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Submission CSV to write
        #[arg(short, long, value_name = "FILE", default_value = "submission.csv")]
        output: PathBuf,

        /// Also save the trained ensemble (bincode)
        #[arg(long, value_name = "FILE")]
        save_model: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Evaluate {
            interactions,
            tracks,
            config,
            playlist_fraction,
            test_fraction,
            seed,
            k,
        } => evaluate::run(&EvaluateArgs {
            interactions,
            tracks: tracks.as_deref(),
            config: config.as_deref(),
            holdout: Holdout::new()
                .with_playlist_fraction(*playlist_fraction)
                .with_test_fraction(*test_fraction)
                .with_random_state(*seed),
            k: *k,
            json: cli.json,
        }),

        Commands::Predict {
            interactions,
            targets,
            tracks,
            config,
            output,
            save_model,
        } => predict::run(&PredictArgs {
            interactions,
            targets,
            tracks: tracks.as_deref(),
            config: config.as_deref(),
            output,
            save_model: save_model.as_deref(),
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            e.exit_code()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_evaluate_defaults() {
        let cli = Cli::try_parse_from(["recomendar", "evaluate", "-i", "train.csv"]).expect("parse");
        match cli.command {
            Commands::Evaluate {
                interactions,
                tracks,
                k,
                seed,
                ..
            } => {
                assert_eq!(interactions, PathBuf::from("train.csv"));
                assert!(tracks.is_none());
                assert_eq!(k, 10);
                assert_eq!(seed, 42);
            }
            Commands::Predict { .. } => panic!("expected evaluate"),
        }
    }

    #[test]
    fn test_predict_requires_targets() {
        assert!(Cli::try_parse_from(["recomendar", "predict", "-i", "train.csv"]).is_err());
    }
}
