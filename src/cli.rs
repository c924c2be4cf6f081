use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "nabaz", about = "Skip tests the current change set cannot affect", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Select, execute, and record tests for the current working tree
    Test {
        /// Repository root
        #[arg(long, default_value = ".")]
        repo_path: PathBuf,

        /// Source language of the code under test (rust, python)
        #[arg(long, default_value = "rust")]
        language: String,

        /// Command printing one test per line ("name" or "name package")
        #[arg(long)]
        list_cmd: String,

        /// Command executing tests; receives NABAZ_SKIP, NABAZ_RESULTS,
        /// NABAZ_PROFILE in its environment
        #[arg(long)]
        run_cmd: String,

        /// Run history database path (defaults to the user cache directory)
        #[arg(long, env = "NABAZ_DB")]
        db_path: Option<PathBuf>,
    },
}
