use log::{error, info, LevelFilter};
use rocket::Error as RocketError;
use thiserror::Error;

/// Environment variable overriding the location of the logging config.
const LOG_CONFIG_VAR: &str = "ELECTION_LOG_CONFIG";

/// Errors that stop the server from starting or keep it from running.
#[derive(Debug, Error)]
enum ServerError {
    #[error(transparent)]
    Rocket(#[from] RocketError),
}

async fn serve() -> Result<(), ServerError> {
    info!("Igniting election server...");
    let rocket = campus_election::build().ignite().await?;
    info!("...store and mailer ready");
    // Rocket's own request logging would duplicate the logger fairing.
    log4rs_dynamic_filters::DynamicLevelFilter::set("rocket", LevelFilter::Off);
    rocket.launch().await?;
    Ok(())
}

#[rocket::main]
async fn main() {
    let log_config = std::env::var(LOG_CONFIG_VAR).unwrap_or_else(|_| "log4rs.yaml".to_string());
    if let Err(err) =
        log4rs::init_file(&log_config, log4rs_dynamic_filters::default_deserializers())
    {
        eprintln!("Cannot load logging config {log_config}: {err}");
        std::process::exit(2)
    }
    info!("Logging configured from {log_config}");

    if let Err(err) = serve().await {
        error!("{err}");
        error!("Election server stopped after a fatal error");
        std::process::exit(1)
    }
}
