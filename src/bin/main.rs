//! Binary entrypoint for the stepwise tool

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    stepwise::cli::run().await
}
