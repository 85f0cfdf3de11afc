mod cli;
mod infra;
mod routes;
mod server;

use onboard::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
