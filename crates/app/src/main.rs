// CLI modules
mod args;
mod logging;
mod op;
mod ops;
mod services;
mod state;

use args::Args;
use clap::{Parser, Subcommand};
use op::Op;
use ops::{Connect, Disconnect, Download, Init, List, Record, Status, Upload, Verify, Version, Watch};
use state::{AppState, LogConfig};

command_enum! {
    (Init, Init),
    (Connect, Connect),
    (Disconnect, Disconnect),
    (Status, Status),
    (Upload, Upload),
    (List, List),
    (Download, Download),
    (Verify, Verify),
    (Record, Record),
    (Watch, Watch),
    (Version, Version),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // an uninitialized directory still gets stderr logging at the default level
    let log_config = AppState::load(args.config_path.clone())
        .map(|state| state.config.log)
        .unwrap_or_else(|_| LogConfig::default());
    let guards = logging::init_logging(&log_config);

    let ctx = op::OpContext::new(args.config_path);

    match args.command.execute(&ctx).await {
        Ok(output) => {
            println!("{}", output);
            drop(guards);
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            drop(guards);
            std::process::exit(1);
        }
    }
}
