use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Compiled-in fallback for the cookie-signing secret. Fine for local
/// development only; any deployment must override it.
pub const DEFAULT_SESSION_SECRET: &str = "insecure-dev-secret-change-me";

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub session_secret: String,
    pub region: String,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Web console for S3-compatible object stores")]
pub struct Args {
    /// Host to bind to (overrides S3_CONSOLE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides S3_CONSOLE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Session cookie signing secret (overrides S3_CONSOLE_SESSION_SECRET)
    #[arg(long)]
    pub session_secret: Option<String>,

    /// Region used in request signing (overrides S3_CONSOLE_REGION)
    #[arg(long)]
    pub region: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("S3_CONSOLE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("S3_CONSOLE_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing S3_CONSOLE_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 5000,
            Err(err) => return Err(err).context("reading S3_CONSOLE_PORT"),
        };
        let env_secret =
            env::var("S3_CONSOLE_SESSION_SECRET").unwrap_or_else(|_| DEFAULT_SESSION_SECRET.into());
        let env_region = env::var("S3_CONSOLE_REGION").unwrap_or_else(|_| "us-east-1".into());

        // --- Merge ---
        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            session_secret: args.session_secret.unwrap_or(env_secret),
            region: args.region.unwrap_or(env_region),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
