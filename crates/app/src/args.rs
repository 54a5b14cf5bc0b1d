pub use clap::Parser;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "timevault")]
#[command(about = "Register files on-chain and pin them to IPFS")]
pub struct Args {
    /// Path to the timevault config directory (defaults to ~/.timevault)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}
