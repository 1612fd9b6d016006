use broadcast_relay::Settings;
use clap::Parser;
use color_eyre::eyre::Report;

#[tokio::main]
async fn main() -> Result<(), Report> {
    // Loaded first so `RUST_LOG` from the file reaches the filter.
    let dotenv = dotenvy::dotenv();
    broadcast_relay::layers::init_tracing()?;

    match dotenv {
        Ok(path) => tracing::debug!(?path, "Loaded environment file"),
        Err(error) if error.not_found() => tracing::trace!("No environment file found"),
        Err(error) => return Err(error.into()),
    }

    let settings = Settings::parse();
    broadcast_relay::run(settings).await
}
