//! Command-line interface for articast
//!
//! Provides argument parsing using clap derive macros.

use crate::job::Voice;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

/// Turn article URLs into a single audio podcast
#[derive(Parser, Debug)]
#[command(name = "articast", version, about = "Turn article URLs into a single audio podcast")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: per-article progress, -vv: full diagnostics)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Parse a voice name, listing the known ones on failure.
fn parse_voice(s: &str) -> Result<Voice, String> {
    Voice::from_str(s).map_err(|_| {
        let known: Vec<&str> = Voice::ALL.iter().map(|v| v.as_str()).collect();
        format!("unknown voice '{}', expected one of: {}", s, known.join(", "))
    })
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the worker consume loop (foreground process for systemd)
    Worker {
        /// Consume loops to run, each with its own connections and models
        #[arg(long, value_name = "N")]
        workers: Option<usize>,

        /// Serve only these voices instead of every configured one
        #[arg(long, value_name = "VOICE", value_parser = parse_voice, num_args = 1..)]
        voices: Vec<Voice>,
    },

    /// Submit a podcast job for one or more article URLs
    Submit {
        /// Article URLs, processed in the given order
        #[arg(required = true, value_name = "URL")]
        urls: Vec<String>,

        /// Voice to synthesize with (default from config)
        #[arg(long, value_name = "VOICE", value_parser = parse_voice)]
        voice: Option<Voice>,
    },

    /// Query a job's status
    Status {
        /// Job id returned by submit
        #[arg(value_name = "JOB_ID")]
        job_id: String,
    },

    /// Fetch the finished podcast of a succeeded job
    Fetch {
        /// Job id returned by submit
        #[arg(value_name = "JOB_ID")]
        job_id: String,

        /// Copy the podcast here instead of printing its path
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Synthesize a text file straight to an audio file, no queue involved
    Speak {
        /// Text file to read
        #[arg(value_name = "TEXT_FILE")]
        input: PathBuf,

        /// Output audio file (.wav or .mp3)
        #[arg(short, long, value_name = "PATH")]
        output: PathBuf,

        /// Voice to synthesize with (default from config)
        #[arg(long, value_name = "VOICE", value_parser = parse_voice)]
        voice: Option<Voice>,
    },

    /// Check system dependencies
    Check,

    /// View configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration inspection actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the configuration file path
    Path,
}
