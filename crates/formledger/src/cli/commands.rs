//! CLI command definitions.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::config::Config;

/// Serve command arguments.
#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Address to listen on (overrides `server.bind`)
    #[arg(short, long, value_name = "ADDR")]
    pub bind: Option<SocketAddr>,

    /// Disable CORS headers
    #[arg(long)]
    pub no_cors: bool,

    /// Registrations file (overrides `storage.registrations_path`)
    #[arg(long, value_name = "FILE")]
    pub registrations: Option<PathBuf>,

    /// Dataset file (overrides `storage.dataset_path`)
    #[arg(long, value_name = "FILE")]
    pub dataset: Option<PathBuf>,
}

impl ServeCommand {
    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(bind) = self.bind {
            config.server.bind = bind;
        }
        if self.no_cors {
            config.server.cors = false;
        }
        if let Some(path) = &self.registrations {
            config.storage.registrations_path.clone_from(path);
        }
        if let Some(path) = &self.dataset {
            config.storage.dataset_path.clone_from(path);
        }
    }
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
