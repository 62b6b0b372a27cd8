//! Command-line surface: `unpack` and `list-formats`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::naming::NamingStrategy;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Recursively unpack one or more inputs into an output directory.
    #[command(alias = "u")]
    Unpack {
        /// One or more input files to unpack.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Directory files are written into. Created if missing.
        #[arg(short, long)]
        output: PathBuf,

        /// Force recognition to start from this decoder id (e.g.
        /// `leaf/kcap`) instead of trying the whole registry.
        #[arg(long, value_name = "ID")]
        format: Option<String>,

        /// Override every archive decoder's naming strategy.
        #[arg(long, value_enum)]
        naming: Option<NamingStrategy>,

        /// Recursion depth at which a file is demoted to verbatim
        /// emission instead of continued unpacking.
        #[arg(long, default_value_t = crate::driver::DEFAULT_MAX_DEPTH)]
        max_depth: usize,

        /// Number of worker threads driving independent root inputs in
        /// parallel. 0 selects the number of logical CPUs.
        #[arg(short, long, default_value_t = 0)]
        jobs: usize,

        /// Emit debug-level decode events in addition to warnings.
        #[arg(short, long)]
        verbose: bool,
    },

    /// List every registered decoder id.
    #[command(name = "list-formats")]
    List {
        /// Emit the list as a JSON array instead of plain text.
        #[arg(long)]
        json: bool,
    },
}

pub fn parse() -> Args {
    Args::parse()
}
