use clap::Parser;
use colored::*;
use gemini_chat_core::config::{get_default_config_file, APP_NAME};
use gemini_chat_core::{ChatController, GeminiConfig};
use std::process::ExitCode;
use tracing::{debug, warn};

mod app;
mod cli;
mod logging;
mod output;

use crate::cli::Args;
use crate::output::TerminalView;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let (config, load_error) = load_config(&args);
    logging::init_logging(config.log_level.as_deref());
    if let Some(err) = load_error {
        warn!("Ignoring config file: {}", err);
        eprintln!("{}", format!("Warning: {}", err).yellow());
    }
    debug!(model = config.model_name(), "Configuration loaded");

    let view = TerminalView::new(config.render_markdown());
    let mut controller = ChatController::start(&config, view);

    let result = match (&args.prompt, args.interactive()) {
        (Some(prompt), false) => app::run_single_query(&mut controller, prompt).await,
        (Some(prompt), true) => {
            // Failures are already shown in the chat; keep the session going
            let _ = controller.submit(prompt).await;
            println!();
            app::run_interactive_chat(&mut controller).await
        }
        (None, _) => app::run_interactive_chat(&mut controller).await,
    };

    if !controller.input_enabled() && controller.log().is_empty() {
        return ExitCode::FAILURE;
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", format!("Error: {:#}", e).red());
            ExitCode::FAILURE
        }
    }
}

/// File, then environment, then command line; later layers win
fn load_config(args: &Args) -> (GeminiConfig, Option<String>) {
    let path = match &args.config {
        Some(path) => Ok(path.clone()),
        None => get_default_config_file(APP_NAME),
    };

    let (file_config, load_error) = match path.and_then(|p| GeminiConfig::load_from_file(&p)) {
        Ok(config) => (config, None),
        Err(e) => (GeminiConfig::default(), Some(e.to_string())),
    };

    let config = file_config
        .merge(&GeminiConfig::from_env())
        .merge(&args.overlay());
    (config, load_error)
}
