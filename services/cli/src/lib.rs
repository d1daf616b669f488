mod cli;
mod commands;
mod infra;
mod stage;

use parrainage::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
