//! Shared utilities for demos.
//!
//! Provides common functionality used across demos:
//! - Command-line argument parsing
//! - Logging initialization
//! - Credentials from the environment

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments for demos.
#[derive(Debug, Clone)]
pub struct Args {
    pub debug: bool,
    pub endpoint: Option<String>,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self {
            debug: args.iter().any(|a| a == "--debug"),
            endpoint: args
                .iter()
                .position(|a| a == "--endpoint")
                .and_then(|i| args.get(i + 1).cloned()),
        }
    }
}

/// Sinric Pro credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub app_key: String,
    pub app_secret: String,
    pub device_id: String,
}

impl Credentials {
    /// Reads `SINRIC_APP_KEY`, `SINRIC_APP_SECRET` and `SINRIC_DEVICE_ID`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            app_key: env_var("SINRIC_APP_KEY")?,
            app_secret: env_var("SINRIC_APP_SECRET")?,
            device_id: env_var("SINRIC_DEVICE_ID")?,
        })
    }
}

// ============================================================================
// Functions
// ============================================================================

fn env_var(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("{name} must be set"))
}

/// Initialize tracing/logging.
pub fn init_logging(debug: bool) {
    let filter = if debug {
        "sinric_client=debug,dimmer=debug"
    } else {
        "sinric_client=info,dimmer=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}
