use crate::{
    configuration::Configuration,
    github::{DEFAULT_API_URL, DEFAULT_REPOSITORY},
};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Booking and release-notes backend for the community site")]
pub struct ConfigurationHandler {
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Runs with an in-memory store when omitted.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    admin_password: String,

    #[arg(long, env = "RELEASE_SYNC_TOKEN", hide_env_values = true)]
    sync_token: Option<String>,

    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    github_api_url: String,

    #[arg(long, env = "GITHUB_REPOSITORY", default_value = DEFAULT_REPOSITORY)]
    github_repository: String,

    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// JSON availability settings applied at start-up when none are stored.
    #[arg(long, env = "AVAILABILITY_FILE")]
    availability_file: Option<PathBuf>,
}

impl ConfigurationHandler {
    pub fn parse_arguments() -> Self {
        Self::parse()
    }
}

impl Configuration for ConfigurationHandler {
    fn port(&self) -> u16 {
        self.port
    }

    fn database_url(&self) -> Option<String> {
        self.database_url.clone()
    }

    fn admin_password(&self) -> String {
        self.admin_password.clone()
    }

    fn sync_token(&self) -> Option<String> {
        self.sync_token.clone().filter(|token| !token.is_empty())
    }

    fn github_api_url(&self) -> String {
        self.github_api_url.clone()
    }

    fn github_repository(&self) -> String {
        self.github_repository.clone()
    }

    fn github_token(&self) -> Option<String> {
        self.github_token.clone().filter(|token| !token.is_empty())
    }

    fn availability_file(&self) -> Option<PathBuf> {
        self.availability_file.clone()
    }
}
