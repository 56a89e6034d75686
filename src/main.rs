use std::path::PathBuf;

use clap::{Parser, Subcommand};

use loansim::core::DEFAULT_STATE_FILE;

#[derive(Parser, Debug)]
#[command(name = "loansim", about = "Loan disbursal growth simulator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Serve the simulator UI and JSON API over HTTP")]
    Serve {
        #[arg(long, default_value_t = 8080, help = "Port to listen on")]
        port: u16,
        #[arg(
            long,
            default_value = DEFAULT_STATE_FILE,
            help = "Path of the JSON file the repository is persisted to"
        )]
        state_file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    match cli.command {
        Command::Serve { port, state_file } => {
            if let Err(e) = loansim::api::run_http_server(port, state_file).await {
                eprintln!("Server error: {e}");
                std::process::exit(1);
            }
        }
    }
}
