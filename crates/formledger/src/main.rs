//! `formledger` - CLI for the registration server
//!
//! Runs the HTTP server and offers a few inspection commands for the
//! configuration and the files it points at.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::Context;
use clap::Parser;

use formledger::cli::{Cli, Command, ConfigCommand, ServeCommand};
use formledger::{init_logging, Config, DatasetReader, RecordStore, Server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    match cli.command {
        Command::Serve(serve_cmd) => handle_serve(config, &serve_cmd).await,
        Command::Status(status_cmd) => handle_status(&config, status_cmd.json),
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

async fn handle_serve(mut config: Config, cmd: &ServeCommand) -> anyhow::Result<()> {
    cmd.apply(&mut config);
    config.validate().context("invalid serve options")?;

    Server::new(config)
        .run()
        .await
        .context("running server")?;
    Ok(())
}

fn handle_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let registrations =
        RecordStore::count_at(config.registrations_path()).map_err(|e| e.to_string());
    let dataset_rows = DatasetReader::new(config.dataset_path())
        .with_excluded_columns(config.storage.excluded_columns.clone())
        .read_all()
        .map(|rows| rows.len())
        .map_err(|e| e.to_string());

    if json {
        let status = serde_json::json!({
            "bind": config.server.bind,
            "registrations_path": config.registrations_path(),
            "registrations": registrations.as_ref().ok(),
            "registrations_error": registrations.as_ref().err(),
            "dataset_path": config.dataset_path(),
            "dataset_rows": dataset_rows.as_ref().ok(),
            "dataset_error": dataset_rows.as_ref().err(),
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("formledger status");
        println!("-----------------");
        println!("Listen address:  {}", config.server.bind);
        println!("Registrations:   {}", config.registrations_path().display());
        match &registrations {
            Ok(n) => println!("  Stored:        {n}"),
            Err(e) => println!("  Error:         {e}"),
        }
        println!("Dataset:         {}", config.dataset_path().display());
        match &dataset_rows {
            Ok(n) => println!("  Rows:          {n}"),
            Err(e) => println!("  Error:         {e}"),
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Server]");
                println!("  Bind:               {}", config.server.bind);
                println!("  CORS:               {}", config.server.cors);
                match &config.server.static_dir {
                    Some(dir) => println!("  Static directory:   {}", dir.display()),
                    None => println!("  Static directory:   (disabled)"),
                }
                println!();
                println!("[Storage]");
                println!(
                    "  Registrations:      {}",
                    config.registrations_path().display()
                );
                println!("  Dataset:            {}", config.dataset_path().display());
                println!(
                    "  Excluded columns:   {}",
                    config.storage.excluded_columns.join(", ")
                );
                println!("  Writer queue:       {}", config.storage.writer_queue);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
