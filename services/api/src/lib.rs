mod cli;
mod infra;
mod routes;
mod seed;
mod server;

use el_correo::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
