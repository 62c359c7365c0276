mod cli;
mod demo;
mod infra;
mod reconcile;
mod routes;
mod server;

use ongkir_engine::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
