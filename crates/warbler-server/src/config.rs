use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Placeholder session secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "it's a secret",
];

pub struct Config {
    pub database_url: String,
    pub secret_key: String,
    pub addr: SocketAddr,
    pub static_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let secret_key = std::env::var("WARBLER_SECRET_KEY").unwrap_or_default();
        if secret_key.is_empty() || PLACEHOLDER_SECRETS.contains(&secret_key.as_str()) {
            bail!("WARBLER_SECRET_KEY is unset or still a placeholder; set it in your .env file");
        }

        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://warbler.db".into());
        let host = std::env::var("WARBLER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = std::env::var("WARBLER_PORT")
            .unwrap_or_else(|_| "5000".into())
            .parse()
            .context("WARBLER_PORT must be a port number")?;
        let static_dir: PathBuf = std::env::var("WARBLER_STATIC_DIR")
            .unwrap_or_else(|_| "static".into())
            .into();

        let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

        Ok(Self {
            database_url,
            secret_key,
            addr,
            static_dir,
        })
    }
}
