use clap::Parser;
use statuswatch_client::{Cli, run};

#[tokio::main]
async fn main() -> Result<(), statuswatch_client::AppError> {
    run(Cli::parse()).await
}
