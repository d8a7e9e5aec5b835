use anyhow::{anyhow, Context, Result};
use colored::*;
use gemini_chat_core::{ChatController, TurnOutcome};
use std::io::{self, Write};
use tracing::{debug, info};

use crate::output::{print_help, TerminalView};

/// Sends one prompt, prints the reply and its suggestions, and returns
pub async fn run_single_query(
    controller: &mut ChatController<TerminalView>,
    prompt: &str,
) -> Result<()> {
    info!("Running single query");

    match controller.submit(prompt).await {
        TurnOutcome::Completed => Ok(()),
        TurnOutcome::Failed(kind) => Err(anyhow!("The turn failed ({:?} error)", kind)),
        TurnOutcome::Ignored if !controller.input_enabled() => {
            Err(anyhow!("The assistant is not available"))
        }
        TurnOutcome::Ignored => Err(anyhow!("Nothing to send: the prompt is empty")),
    }
}

/// Reads lines from stdin until EOF or an exit command
pub async fn run_interactive_chat(controller: &mut ChatController<TerminalView>) -> Result<()> {
    if !controller.input_enabled() {
        return Ok(());
    }

    println!("Starting interactive chat. Type '/help' for commands, 'exit' to leave.");
    println!();

    loop {
        print!("{}: ", "You".green().bold());
        io::stdout().flush().context("Failed to flush stdout")?;

        let mut input = String::new();
        let read = io::stdin()
            .read_line(&mut input)
            .context("Failed to read input")?;
        if read == 0 {
            println!();
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit")
            || input.eq_ignore_ascii_case("quit")
            || input == "/exit"
        {
            println!("Exiting chat session.");
            break;
        }

        if input == "/help" {
            print_help();
            continue;
        }

        let outcome = match parse_chip_command(input) {
            Some(number) => {
                if number == 0 || number > controller.suggestions().len() {
                    println!("{}", format!("No suggestion /{}", number).yellow());
                    continue;
                }
                controller.select_suggestion(number - 1).await
            }
            None => {
                controller.view_mut().note_typed(input);
                controller.submit(input).await
            }
        };
        debug!(?outcome, "Turn finished");
        println!();

        if !controller.input_enabled() {
            break;
        }
    }

    Ok(())
}

/// `/3` selects the third suggestion
fn parse_chip_command(input: &str) -> Option<usize> {
    input.strip_prefix('/')?.parse().ok()
}
