use std::{error::Error, time::Duration};

use crate::{
    backend::Backend, configuration::Configuration, configuration_handler::ConfigurationHandler,
    database_interface::DatabaseInterface, http::create_app, local_store::LocalStore,
    seed::seed_availability,
};
use axum::Router;
use tokio::time::sleep;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod availability;
mod backend;
mod call_scheduler;
mod configuration;
mod configuration_handler;
mod database_interface;
mod error;
mod github;
mod http;
mod local_store;
mod release_notes;
mod release_sync;
mod revalidate;
mod schema;
mod seed;
#[cfg(test)]
mod testutils;
mod types;

fn build_app<B: Backend>(
    backend: B,
    configuration: ConfigurationHandler,
) -> Result<Router, Box<dyn Error>> {
    if let Some(path) = configuration.availability_file() {
        seed_availability(&backend, &path)?;
    }
    Ok(create_app(backend, configuration)?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("################");
    println!("# Site Backend #");
    println!("################");

    let configuration = ConfigurationHandler::parse_arguments();

    let address = format!("0.0.0.0:{}", configuration.port());
    println!("Accessible at:\n{}", address);
    let listener = tokio::net::TcpListener::bind(address).await?;

    let app = if let Some(database_url) = configuration.database_url() {
        let backend = loop {
            match DatabaseInterface::new(&database_url) {
                Ok(backend) => {
                    info!("Successfully connected to database");
                    break backend;
                }
                Err(err) => {
                    error!(?err, "Failed to establish database connection: {database_url}. Retry in 1 sec. You may want to restart it with database disabled (in-memory store).");
                    sleep(Duration::from_secs(1)).await;
                }
            }
        };
        build_app(backend, configuration)?
    } else {
        warn!("No database configured, bookings and releases are kept in memory");
        build_app(LocalStore::default(), configuration)?
    };

    axum::serve(listener, app).await?;
    Ok(())
}
