use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    corey_cli::run().await
}
