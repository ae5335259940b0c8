mod cli;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();
    cli.init_logging();

    if let Err(err) = cli.run().await {
        tracing::error!("{:#}", err);
        eprintln!("s3sum error: {:#}", err);
        std::process::exit(1);
    }
}
