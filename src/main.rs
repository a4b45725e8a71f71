//! # Story Jobs - Entry Point
//! src/main.rs
//!
//! CLI de consulta sobre el directorio de outputs: estado de un job y
//! resultado reconstruido, con la misma forma que devuelve la API.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use story_jobs::api::{result_response, status_response, ApiResponse};
use story_jobs::config::Config;
use story_jobs::jobs::JobStore;
use story_jobs::logging;
use story_jobs::result::ResultAssembler;
use story_jobs::storage::OutputLayout;

#[derive(Parser)]
#[command(name = "story_jobs", version, about = "Inspect story generation jobs")]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Muestra el registro de un job
    Status { id: String },

    /// Reconstruye el resultado de un job terminado
    Result { id: String },

    /// Muestra la configuración efectiva
    Config,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = cli.config.validate() {
        eprintln!("Invalid configuration: {}", e);
        return ExitCode::FAILURE;
    }

    // Si ya hay un subscriber instalado, se usa ese
    let _ = logging::init(&cli.config.log_config());

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<bool> {
    let layout = OutputLayout::from_config(&cli.config);

    let response = match &cli.command {
        Command::Config => {
            cli.config.print_summary();
            return Ok(true);
        }
        Command::Status { id } => status_response(&JobStore::new(layout), id),
        Command::Result { id } => {
            let assembler = ResultAssembler::new(layout.clone());
            result_response(&JobStore::new(layout), &assembler, id)
        }
    };

    print_response(&response)
}

fn print_response(response: &ApiResponse) -> anyhow::Result<bool> {
    let body =
        serde_json::to_string_pretty(&response.body).context("Failed to render response")?;

    if response.status.is_success() {
        println!("{}", body);
        Ok(true)
    } else {
        if response.status.is_server_error() {
            tracing::error!(status = %response.status, "Lookup failed");
        } else if response.status.is_client_error() {
            tracing::debug!(status = %response.status, "Lookup rejected");
        }
        eprintln!("{}", body);
        Ok(false)
    }
}
